//! # Observability
//!
//! Prometheus metrics collection and logging setup.
//!
//! - `metrics`: Prometheus metrics collection
//! - `logging`: tracing subscriber initialisation

pub mod logging;
pub mod metrics;
