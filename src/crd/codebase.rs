//! # Codebase
//!
//! Desired state of a provisioned repository and its CI wiring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BRANCH;

/// Codebase Custom Resource Definition
///
/// A codebase is an application, library or autotest project whose repository,
/// deployment templates, webhook and CI registration are provisioned by the operator.
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1
/// kind: Codebase
/// metadata:
///   name: payments
///   namespace: platform
/// spec:
///   type: application
///   lang: java
///   framework: java17
///   buildTool: maven
///   strategy: create
///   gitServer: gitlab
///   gitUrlPath: /platform/payments
///   ciTool: tekton
///   defaultBranch: main
///   deploymentScript: helm-chart
///   versioning:
///     type: default
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Codebase",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    status = "crate::crd::CodebaseStatus",
    shortname = "cb",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.value"}, {"name":"Available", "type":"boolean", "jsonPath":".status.available"}, {"name":"Failures", "type":"integer", "jsonPath":".status.failureCount"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseSpec {
    /// Programming language, e.g. java, go, python
    pub lang: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub build_tool: String,
    /// How the repository comes into existence
    pub strategy: Strategy,
    /// Source repository for the clone strategy
    #[serde(default)]
    pub repository: Option<Repository>,
    /// Name of the GitServer resource hosting the repository
    pub git_server: String,
    /// Project path on the git server, e.g. `/group/project`
    /// Required for the import strategy
    #[serde(default)]
    pub git_url_path: Option<String>,
    /// Target CI tool
    /// Values: jenkins, tekton, gitlab ci
    #[serde(default = "default_ci_tool")]
    pub ci_tool: String,
    /// Codebase type
    /// Values: application, library, autotest
    #[serde(default = "default_codebase_type", rename = "type")]
    pub codebase_type: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Deployment template flavour, e.g. helm-chart
    #[serde(default = "default_deployment_script")]
    pub deployment_script: String,
    #[serde(default)]
    pub versioning: Versioning,
    /// Jenkins folder provisioner job, used by Jenkins-backed chains
    #[serde(default)]
    pub job_provisioning: Option<String>,
    /// Skip pushing deployment templates
    #[serde(default)]
    pub disable_put_deploy_templates: bool,
    /// Create an empty repository (README only) instead of rendering a template
    #[serde(default)]
    pub empty_project: bool,
}

/// Repository creation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Render a new repository from templates
    Create,
    /// Clone an upstream repository into a new project
    Clone,
    /// Adopt an existing project on the git server
    Import,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Create => "create",
            Strategy::Clone => "clone",
            Strategy::Import => "import",
        };
        f.write_str(s)
    }
}

/// CI tool a codebase is wired into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiTool {
    Jenkins,
    Tekton,
    GitlabCi,
}

impl CiTool {
    /// Parse the free-form `ciTool` field
    ///
    /// Anything that is neither Tekton nor GitLab CI is treated as Jenkins.
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "tekton" => CiTool::Tekton,
            "gitlab" | "gitlabci" => CiTool::GitlabCi,
            _ => CiTool::Jenkins,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    /// Values: default, edp, semver
    #[serde(default = "default_versioning_type", rename = "type")]
    pub versioning_type: String,
    #[serde(default)]
    pub start_from: Option<String>,
}

impl Default for Versioning {
    fn default() -> Self {
        Self {
            versioning_type: default_versioning_type(),
            start_from: None,
        }
    }
}

/// Status of the Codebase resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseStatus {
    #[serde(flatten)]
    pub common: crate::crd::EntityStatus,
    /// Progress marker when kept in the entity status
    #[serde(default)]
    pub git: Option<String>,
    /// Identifier of the registered repository webhook
    #[serde(default)]
    pub webhook_id: Option<i64>,
    /// Browsable URL of the repository
    #[serde(default)]
    pub git_web_url: Option<String>,
}

/// Languages the operator has templates for
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "java",
    "javascript",
    "python",
    "go",
    "dotnet",
    "csharp",
    "groovy-pipeline",
    "terraform",
    "rego",
    "container",
    "helm",
    "other",
];

impl CodebaseSpec {
    #[must_use]
    pub fn ci(&self) -> CiTool {
        CiTool::parse(&self.ci_tool)
    }

    /// Lowercased language
    #[must_use]
    pub fn language(&self) -> String {
        self.lang.to_lowercase()
    }

    /// Project path without the leading slash
    #[must_use]
    pub fn project_path(&self, codebase_name: &str) -> String {
        self.git_url_path
            .as_deref()
            .map(|p| p.trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| codebase_name.to_string())
    }
}

pub fn default_ci_tool() -> String {
    "jenkins".to_string()
}

pub fn default_codebase_type() -> String {
    "application".to_string()
}

pub fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

pub fn default_deployment_script() -> String {
    "helm-chart".to_string()
}

pub fn default_versioning_type() -> String {
    "default".to_string()
}
