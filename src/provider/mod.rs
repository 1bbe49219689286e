//! # Provider Modules
//!
//! Collaborators the provisioning handlers drive: git, Gerrit, hosted git
//! providers (GitLab, GitHub) and the Jenkins job runner.
//!
//! Handlers only see the traits in this module; the adapters are thin and
//! replaceable.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::crd::GitServer;

pub mod factory;
pub mod gerrit;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod jenkins;
mod ssh;

pub use factory::HttpProviderFactory;
pub use gerrit::GerritSsh;
pub use git::GitCli;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use jenkins::{JenkinsClient, NoopJobRunner};

/// Credentials for git transport
#[derive(Clone, PartialEq, Eq)]
pub enum GitAuth {
    /// Public repository
    None,
    /// SSH private key
    Ssh { user: String, private_key: String },
    /// HTTPS basic auth (token as password)
    Basic { user: String, password: String },
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitAuth::None => f.write_str("None"),
            GitAuth::Ssh { user, .. } => f.debug_struct("Ssh").field("user", user).finish_non_exhaustive(),
            GitAuth::Basic { user, .. } => f.debug_struct("Basic").field("user", user).finish_non_exhaustive(),
        }
    }
}

/// Local git operations
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone `url` into `destination`, which must not exist yet
    async fn clone_repository(&self, url: &str, auth: &GitAuth, destination: &Path) -> Result<()>;

    /// Initialise an empty repository on `branch`
    async fn init_repository(&self, directory: &Path, branch: &str) -> Result<()>;

    /// Stage and commit everything; returns false when there was nothing to commit
    async fn commit_all(&self, directory: &Path, message: &str) -> Result<bool>;

    /// Push `refspec` to `url`
    async fn push(&self, directory: &Path, url: &str, auth: &GitAuth, refspec: &str) -> Result<()>;

    /// Create `branch` at `from_commit` (or HEAD when empty) in a local checkout
    async fn create_branch(&self, directory: &Path, branch: &str, from_commit: &str) -> Result<()>;

    async fn remote_branch_exists(&self, url: &str, auth: &GitAuth, branch: &str) -> Result<bool>;
}

/// SSH access to a Gerrit server
#[derive(Clone)]
pub struct GerritAccess {
    pub host: String,
    pub port: i32,
    pub user: String,
    pub private_key: String,
}

impl std::fmt::Debug for GerritAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GerritAccess")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Gerrit project administration
#[async_trait]
pub trait GerritClient: Send + Sync {
    async fn project_exists(&self, access: &GerritAccess, project: &str) -> Result<bool>;
    async fn create_project(&self, access: &GerritAccess, project: &str) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The project or webhook does not exist
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected response {status}: {body}")]
    Unexpected { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub id: i64,
    pub url: String,
}

/// Hosted git provider REST surface
#[async_trait]
pub trait GitProvider: Send + Sync {
    async fn create_project(&self, project_path: &str, default_branch: &str) -> Result<(), ProviderError>;

    async fn project_exists(&self, project_path: &str) -> Result<bool, ProviderError>;

    async fn repository_ssh_url(&self, project_path: &str) -> Result<String, ProviderError>;

    /// Register a push/merge webhook; returns its identifier
    async fn create_webhook(
        &self,
        project_path: &str,
        url: &str,
        secret: &str,
    ) -> Result<i64, ProviderError>;

    async fn get_webhook(&self, project_path: &str, webhook_id: i64) -> Result<Webhook, ProviderError>;

    /// Webhooks currently registered on the project
    async fn list_webhooks(&self, project_path: &str) -> Result<Vec<Webhook>, ProviderError>;

    async fn delete_webhook(&self, project_path: &str, webhook_id: i64) -> Result<(), ProviderError>;
}

/// Builds a provider client for a git server
pub trait GitProviderFactory: Send + Sync {
    fn for_server(&self, server: &GitServer, token: &str) -> Result<Arc<dyn GitProvider>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// No such job
    Missing,
    /// The job exists but has never run
    NotStarted,
    Running,
    Succeeded,
    Failed(String),
}

/// External CI job execution
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Status of the job's last build
    async fn job_status(&self, job: &str) -> Result<JobStatus>;
    async fn trigger_job(&self, job: &str, parameters: &BTreeMap<String, String>) -> Result<()>;
}
