//! # CDStageDeploy
//!
//! Request to deploy a codebase tag to a CD pipeline stage.

use serde::{Deserialize, Serialize};

/// CDStageDeploy Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1
/// kind: CDStageDeploy
/// metadata:
///   name: mypipeline-dev
///   namespace: platform
/// spec:
///   pipeline: mypipeline
///   stage: dev
///   tag:
///     codebase: payments
///     tag: 0.1.0-SNAPSHOT.1
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CDStageDeploy",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    status = "crate::crd::EntityStatus",
    shortname = "csd",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.value"}, {"name":"Pipeline", "type":"string", "jsonPath":".spec.pipeline"}, {"name":"Stage", "type":"string", "jsonPath":".spec.stage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CDStageDeploySpec {
    pub pipeline: String,
    pub stage: String,
    #[serde(default)]
    pub tag: Option<CodebaseTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseTag {
    pub codebase: String,
    pub tag: String,
}

/// Deterministic name of the stage deploy for a pipeline stage
#[must_use]
pub fn stage_deploy_name(pipeline: &str, stage: &str) -> String {
    format!("{pipeline}-{stage}")
}
