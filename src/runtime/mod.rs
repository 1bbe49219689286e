//! # Runtime Module
//!
//! Runtime components for the codebase operator, including initialization,
//! the watch loops and error handling.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
