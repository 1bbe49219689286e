//! # Controller
//!
//! Core controller modules for the codebase operator.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `chain`: handler chains and the chain factory
//! - `errors`: sentinel errors handlers return and their classification
//! - `handlers`: the provisioning steps
//! - `progress`: progress markers and their stores
//! - `reconciler`: the generic reconciliation loop
//! - `templates`: deployment and CI file templates
//! - `workdir`: layout of local checkouts

pub mod backoff;
pub mod chain;
pub mod errors;
pub mod handlers;
pub mod progress;
pub mod reconciler;
pub mod templates;
pub mod workdir;
