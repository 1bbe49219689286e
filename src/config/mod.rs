//! # Configuration
//!
//! Operator configuration loaded from the environment.

mod controller;

pub use controller::ControllerConfig;

use std::sync::Arc;

/// Shared, read-only operator configuration
pub type SharedControllerConfig = Arc<ControllerConfig>;
