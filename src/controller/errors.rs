//! # Handler Errors
//!
//! Sentinel errors handlers return through `anyhow::Error`.
//!
//! Handlers and the chain never classify errors; the reconciler does, once,
//! with [`classify`]. `downcast_ref` on an `anyhow::Error` also finds a
//! sentinel underneath `.context(...)` layers.

use std::time::Duration;

use thiserror::Error;

/// Request to retry later without counting a failure
#[derive(Debug, Clone, Error)]
#[error("postponed for {}s: {reason}", .delay.as_secs())]
pub struct Postpone {
    pub delay: Duration,
    pub reason: String,
}

impl Postpone {
    pub fn new(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            delay,
            reason: reason.into(),
        }
    }
}

/// A get-or-create target already exists and has not been picked up yet
///
/// Each entity kind decides whether this counts as a failure, see
/// `NotYetProcessedPolicy`.
#[derive(Debug, Clone, Error)]
#[error("{kind} {name} has not been processed yet")]
pub struct NotYetProcessed {
    pub kind: String,
    pub name: String,
}

impl NotYetProcessed {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// An external cleanup job has not completed successfully (deletion path)
#[derive(Debug, Clone, Error)]
pub enum JobFailed {
    #[error("job {job} is still running")]
    StillRunning { job: String },
    #[error("job {job} failed: {message}")]
    Failed { job: String, message: String },
}

/// How the reconciler treats a chain error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    Postpone(Duration),
    NotYetProcessed,
    JobFailed,
    Other,
}

impl ErrorClass {
    /// Label used for the requeue metric
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Postpone(_) => "postpone",
            ErrorClass::NotYetProcessed => "not_yet_processed",
            ErrorClass::JobFailed => "job_failed",
            ErrorClass::Other => "error",
        }
    }
}

/// Classify a handler error by the sentinel it carries
#[must_use]
pub fn classify(err: &anyhow::Error) -> ErrorClass {
    if let Some(postpone) = err.downcast_ref::<Postpone>() {
        ErrorClass::Postpone(postpone.delay)
    } else if err.downcast_ref::<NotYetProcessed>().is_some() {
        ErrorClass::NotYetProcessed
    } else if err.downcast_ref::<JobFailed>().is_some() {
        ErrorClass::JobFailed
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_classify_plain_errors() {
        let err = anyhow::anyhow!("connection refused");
        assert_eq!(classify(&err), ErrorClass::Other);
    }

    #[test]
    fn test_classify_postpone() {
        let err = anyhow::Error::new(Postpone::new(Duration::from_secs(30), "parent not ready"));
        assert_eq!(classify(&err), ErrorClass::Postpone(Duration::from_secs(30)));
    }

    #[test]
    fn test_classify_sees_through_context() {
        let result: anyhow::Result<()> = Err(anyhow::Error::new(NotYetProcessed::new(
            "CDStageDeploy",
            "pipe-dev",
        )));
        let err = result.context("failed to put stage deploy").unwrap_err();
        assert_eq!(classify(&err), ErrorClass::NotYetProcessed);

        let result: anyhow::Result<()> = Err(anyhow::Error::new(JobFailed::StillRunning {
            job: "delete-release".to_string(),
        }));
        let err = result.context("cleanup").unwrap_err();
        assert_eq!(classify(&err), ErrorClass::JobFailed);
    }

    #[test]
    fn test_messages() {
        let err = JobFailed::Failed {
            job: "delete-release-payments".to_string(),
            message: "FAILURE".to_string(),
        };
        assert_eq!(err.to_string(), "job delete-release-payments failed: FAILURE");
        let postpone = Postpone::new(Duration::from_secs(30), "codebase payments is not ready");
        assert_eq!(
            postpone.to_string(),
            "postponed for 30s: codebase payments is not ready"
        );
    }
}
