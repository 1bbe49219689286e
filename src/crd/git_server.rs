//! # GitServer
//!
//! Connection details of a git hosting server referenced by codebases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_GIT_USER, DEFAULT_HTTP_PORT, DEFAULT_SSH_PORT};

/// GitServer Custom Resource Definition
///
/// The secret named by `nameSshKeySecret` holds `id_rsa` (SSH private key),
/// `token` (REST API token) and, once generated, `secretString` (webhook secret).
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1
/// kind: GitServer
/// metadata:
///   name: gitlab
///   namespace: platform
/// spec:
///   gitHost: gitlab.example.com
///   gitUser: git
///   httpsPort: 443
///   sshPort: 22
///   nameSshKeySecret: gitlab-config
///   gitProvider: gitlab
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "GitServer",
    group = "v2.edp.epam.com",
    version = "v1",
    namespaced,
    shortname = "gs",
    printcolumn = r#"{"name":"Host", "type":"string", "jsonPath":".spec.gitHost"}, {"name":"Provider", "type":"string", "jsonPath":".spec.gitProvider"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GitServerSpec {
    pub git_host: String,
    #[serde(default = "default_git_user")]
    pub git_user: String,
    #[serde(default = "default_https_port")]
    pub https_port: i32,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: i32,
    /// Secret holding credentials for this server
    pub name_ssh_key_secret: String,
    #[serde(default)]
    pub git_provider: GitProviderKind,
    /// URL registered as repository webhook target
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Hosting software of a git server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GitProviderKind {
    #[default]
    Gerrit,
    Gitlab,
    Github,
    Bitbucket,
}

impl fmt::Display for GitProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GitProviderKind::Gerrit => "gerrit",
            GitProviderKind::Gitlab => "gitlab",
            GitProviderKind::Github => "github",
            GitProviderKind::Bitbucket => "bitbucket",
        };
        f.write_str(s)
    }
}

impl GitServerSpec {
    /// `ssh://user@host:port/path`
    #[must_use]
    pub fn ssh_url(&self, project_path: &str) -> String {
        format!(
            "ssh://{}@{}:{}/{}",
            self.git_user,
            self.git_host,
            self.ssh_port,
            project_path.trim_start_matches('/')
        )
    }

    /// Base URL of the REST API host
    #[must_use]
    pub fn https_base(&self) -> String {
        if self.https_port == DEFAULT_HTTP_PORT {
            format!("https://{}", self.git_host)
        } else {
            format!("https://{}:{}", self.git_host, self.https_port)
        }
    }
}

pub fn default_git_user() -> String {
    DEFAULT_GIT_USER.to_string()
}

pub fn default_https_port() -> i32 {
    DEFAULT_HTTP_PORT
}

pub fn default_ssh_port() -> i32 {
    DEFAULT_SSH_PORT
}
