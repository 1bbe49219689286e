//! # JenkinsFolder
//!
//! Jenkins folder registration created for Jenkins-backed codebases.

use serde::{Deserialize, Serialize};

/// JenkinsFolder Custom Resource Definition
///
/// Created by the operator with an owner reference to its Codebase; a Jenkins
/// integration picks it up and creates the folder and its jobs.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "JenkinsFolder",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    shortname = "jf"
)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsFolderSpec {
    pub codebase_name: String,
    /// Provisioner job that creates the folder contents
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Deterministic JenkinsFolder name for a codebase
#[must_use]
pub fn jenkins_folder_name(codebase_name: &str) -> String {
    format!("{codebase_name}-codebase")
}
