//! # CodebaseImageStream
//!
//! Container image tags built from a codebase branch.

use serde::{Deserialize, Serialize};

/// CodebaseImageStream Custom Resource Definition
///
/// Labels of the form `<pipeline>/<stage>` name the CD stages that deploy
/// the latest tag of this stream.
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1
/// kind: CodebaseImageStream
/// metadata:
///   name: payments-main
///   namespace: platform
///   labels:
///     mypipeline/dev: ""
/// spec:
///   codebase: payments
///   imageName: registry.example.com/platform/payments
///   tags:
///     - name: 0.1.0-SNAPSHOT.1
///       created: "2026-01-10T10:00:00Z"
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CodebaseImageStream",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    status = "crate::crd::EntityStatus",
    shortname = "cbis",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.value"}, {"name":"Codebase", "type":"string", "jsonPath":".spec.codebase"}, {"name":"Image", "type":"string", "jsonPath":".spec.imageName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseImageStreamSpec {
    /// Name of the owning Codebase
    pub codebase: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(default)]
    pub tags: Vec<ImageTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageTag {
    pub name: String,
    /// Creation time (RFC3339)
    #[serde(default)]
    pub created: String,
}

impl CodebaseImageStreamSpec {
    /// The most recently created tag
    ///
    /// Tags with unparseable timestamps sort before any dated tag; among equals
    /// the last one listed wins.
    #[must_use]
    pub fn latest_tag(&self) -> Option<&ImageTag> {
        self.tags.iter().max_by_key(|tag| {
            chrono::DateTime::parse_from_rfc3339(&tag.created)
                .map(|t| t.timestamp())
                .unwrap_or(i64::MIN)
        })
    }
}
