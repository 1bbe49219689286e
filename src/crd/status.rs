//! # Entity Status
//!
//! Status fields shared by every tracked entity kind.

use serde::{Deserialize, Serialize};

/// Lifecycle phase values written to `status.value`
///
/// The field is an open string enum; these are the values the operator writes.
pub mod value {
    /// A reconciliation is underway or waiting on a postponed dependency
    pub const IN_PROGRESS: &str = "in progress";
    /// The last reconciliation failed; see `detailedMessage`
    pub const FAILED: &str = "failed";
    /// Provisioning completed for long-lived entities
    pub const ACTIVE: &str = "active";
    /// Provisioning completed for one-shot entities
    pub const FINISHED: &str = "finished";
}

/// Outcome of the last attempted pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    Success,
    Error,
}

/// Status common to Codebase, CodebaseBranch, CodebaseImageStream and CDStageDeploy
///
/// Optional fields serialize as `null` rather than being skipped so that a merge
/// patch clears them (e.g. `detailedMessage` after recovery from a failure).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatus {
    /// Current lifecycle phase
    /// Values: "in progress", "failed", "active", "finished"
    #[serde(default)]
    pub value: String,
    /// Consecutive failed reconciliations; reset to 0 on full success
    #[serde(default)]
    pub failure_count: i64,
    /// Last error text, only present while failed
    #[serde(default)]
    pub detailed_message: Option<String>,
    /// Last attempted pipeline step
    #[serde(default)]
    pub action: String,
    /// Outcome of the last attempted pipeline step
    #[serde(default)]
    pub result: Option<ActionResult>,
    /// Time of the last status transition (RFC3339)
    #[serde(default)]
    pub last_time_updated: Option<String>,
    /// Whether provisioning has completed at least once
    #[serde(default)]
    pub available: bool,
}

impl EntityStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.value == value::FAILED
    }
}
