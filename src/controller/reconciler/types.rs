//! # Reconciler Types
//!
//! Error type surfaced to the watch loop and the per-kind error policies.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Error returned from a reconciliation
///
/// Chain failures carry the delay computed from the entity's new failure
/// count so the error policy can requeue without recomputing it.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("reconciliation failed: {error:#}")]
    Failed {
        error: anyhow::Error,
        requeue_after: Duration,
    },

    #[error("deletion failed: {error:#}")]
    DeletionFailed {
        error: anyhow::Error,
        requeue_after: Duration,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ReconcilerError {
    /// Delay chosen by the reconciler, if any
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            ReconcilerError::Failed { requeue_after, .. }
            | ReconcilerError::DeletionFailed { requeue_after, .. } => Some(*requeue_after),
            ReconcilerError::Store(_) => None,
        }
    }

    /// Label used for metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilerError::Failed { .. } => "failed",
            ReconcilerError::DeletionFailed { .. } => "deletion_failed",
            ReconcilerError::Store(_) => "store",
        }
    }
}

/// How a kind treats `NotYetProcessed` from its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotYetProcessedPolicy {
    /// Requeue after the current backoff without counting a failure
    Postpone,
    /// Count it like any other failure
    #[default]
    Fail,
}
