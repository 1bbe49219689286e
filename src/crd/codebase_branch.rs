//! # CodebaseBranch
//!
//! A branch of a codebase repository and its image stream.

use serde::{Deserialize, Serialize};

/// CodebaseBranch Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1
/// kind: CodebaseBranch
/// metadata:
///   name: payments-release-1-0
///   namespace: platform
/// spec:
///   codebaseName: payments
///   branchName: release/1.0
///   fromCommit: ""
///   release: true
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CodebaseBranch",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    status = "crate::crd::CodebaseBranchStatus",
    shortname = "cbb",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.value"}, {"name":"Codebase", "type":"string", "jsonPath":".spec.codebaseName"}, {"name":"Branch", "type":"string", "jsonPath":".spec.branchName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseBranchSpec {
    /// Name of the parent Codebase
    pub codebase_name: String,
    /// Git branch name
    pub branch_name: String,
    /// Commit the branch starts from; the default branch head when empty
    #[serde(default)]
    pub from_commit: String,
    /// Release branches get a Jenkins "delete release" cleanup on deletion
    #[serde(default)]
    pub release: bool,
    #[serde(default)]
    pub version: Option<String>,
}

/// Status of the CodebaseBranch resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseBranchStatus {
    #[serde(flatten)]
    pub common: crate::crd::EntityStatus,
    /// Progress marker when kept in the entity status
    #[serde(default)]
    pub git: Option<String>,
}

impl CodebaseBranchSpec {
    /// Name of the CodebaseImageStream that belongs to this branch
    ///
    /// Slashes are not valid in object names, `release/1.0` becomes `release-1-0`.
    #[must_use]
    pub fn image_stream_name(&self) -> String {
        format!("{}-{}", self.codebase_name, sanitize_name(&self.branch_name))
    }
}

/// Turn a branch name into a valid object name fragment
#[must_use]
pub fn sanitize_name(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
