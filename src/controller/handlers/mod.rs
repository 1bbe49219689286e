//! # Handlers
//!
//! The provisioning steps chains are built from.
//!
//! - `codebase`: repository creation, webhooks, templates, CI files and
//!   downstream registrations for `Codebase`
//! - `branch`: git branches, image streams and release cleanup for `CodebaseBranch`
//! - `image_stream`: stage deploys for `CodebaseImageStream`
//! - `stage_deploy`: CI trigger registrations for `CDStageDeploy`
//! - `workdir`: local working directory cleanup shared by the kinds above
//!
//! Every handler holds a [`SharedCollaborators`] and nothing else that
//! outlives a request.

pub mod branch;
pub mod codebase;
pub mod image_stream;
pub mod stage_deploy;
pub mod workdir;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tracing::debug;

use crate::config::SharedControllerConfig;
use crate::constants::{SECRET_KEY_SSH_PRIVATE_KEY, SECRET_KEY_TOKEN};
use crate::controller::progress::ProgressTracker;
use crate::controller::templates::DeployTemplates;
use crate::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, GitProviderKind, GitServer,
    JenkinsFolder,
};
use crate::provider::{
    GerritAccess, GerritClient, GitAuth, GitClient, GitProvider, GitProviderFactory, JobRunner,
};
use crate::store::SharedResourceStore;

/// Everything handlers talk to
pub struct Collaborators {
    pub config: SharedControllerConfig,
    pub git: Arc<dyn GitClient>,
    pub gerrit: Arc<dyn GerritClient>,
    pub providers: Arc<dyn GitProviderFactory>,
    pub jobs: Arc<dyn JobRunner>,
    pub progress: ProgressTracker,
    pub templates: DeployTemplates,
    pub git_servers: SharedResourceStore<GitServer>,
    pub secrets: SharedResourceStore<Secret>,
    pub codebases: SharedResourceStore<Codebase>,
    pub branches: SharedResourceStore<CodebaseBranch>,
    pub image_streams: SharedResourceStore<CodebaseImageStream>,
    pub stage_deploys: SharedResourceStore<CDStageDeploy>,
    pub jenkins_folders: SharedResourceStore<JenkinsFolder>,
    pub config_maps: SharedResourceStore<ConfigMap>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("config", &self.config)
            .field("progress", &self.progress)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

pub type SharedCollaborators = Arc<Collaborators>;

/// A git server together with the credentials from its secret
#[derive(Clone)]
pub struct ServerAccess {
    pub server: GitServer,
    pub secret: Secret,
    pub auth: GitAuth,
    pub token: Option<String>,
}

impl std::fmt::Debug for ServerAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerAccess")
            .field("server", &self.server.name_any())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl ServerAccess {
    #[must_use]
    pub fn kind(&self) -> GitProviderKind {
        self.server.spec.git_provider
    }

    #[must_use]
    pub fn is_gerrit(&self) -> bool {
        self.kind() == GitProviderKind::Gerrit
    }

    /// SSH access for Gerrit administration commands
    pub fn gerrit_access(&self) -> Result<GerritAccess> {
        let GitAuth::Ssh { user, private_key } = &self.auth else {
            bail!(
                "git server {} has no SSH private key",
                self.server.name_any()
            );
        };
        Ok(GerritAccess {
            host: self.server.spec.git_host.clone(),
            port: self.server.spec.ssh_port,
            user: user.clone(),
            private_key: private_key.clone(),
        })
    }

    /// Browsable URL of a project
    #[must_use]
    pub fn web_url(&self, project_path: &str) -> String {
        format!(
            "{}/{}",
            self.server.spec.https_base(),
            project_path.trim_start_matches('/')
        )
    }
}

/// Read a string value from a secret's `data`
#[must_use]
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .filter(|value| !value.is_empty())
}

/// Namespace of a namespaced entity
pub fn namespace_of<K: Resource>(entity: &K) -> Result<String> {
    entity
        .meta()
        .namespace
        .clone()
        .with_context(|| format!("{} has no namespace", entity.meta().name.as_deref().unwrap_or("object")))
}

/// Controller owner reference pointing at `owner`
pub fn owner_reference<K: Resource<DynamicType = ()>>(owner: &K) -> Result<OwnerReference> {
    owner.controller_owner_ref(&()).with_context(|| {
        format!(
            "{} {} has no uid yet",
            K::kind(&()),
            owner.meta().name.as_deref().unwrap_or_default()
        )
    })
}

impl Collaborators {
    pub async fn git_server(&self, namespace: &str, name: &str) -> Result<GitServer> {
        self.git_servers
            .get(namespace, name)
            .await?
            .with_context(|| format!("git server {name} not found in {namespace}"))
    }

    /// Resolve a git server and its credentials
    pub async fn server_access(&self, namespace: &str, server_name: &str) -> Result<ServerAccess> {
        let server = self.git_server(namespace, server_name).await?;
        let secret_name = &server.spec.name_ssh_key_secret;
        let secret = self
            .secrets
            .get(namespace, secret_name)
            .await?
            .with_context(|| format!("secret {secret_name} of git server {server_name} not found"))?;

        let auth = match secret_value(&secret, SECRET_KEY_SSH_PRIVATE_KEY) {
            Some(private_key) => GitAuth::Ssh {
                user: server.spec.git_user.clone(),
                private_key,
            },
            None => GitAuth::None,
        };
        let token = secret_value(&secret, SECRET_KEY_TOKEN);

        Ok(ServerAccess {
            server,
            secret,
            auth,
            token,
        })
    }

    /// REST client of a hosted git provider
    pub fn provider(&self, access: &ServerAccess) -> Result<Arc<dyn GitProvider>> {
        let token = access.token.as_deref().with_context(|| {
            format!(
                "secret {} has no {SECRET_KEY_TOKEN}",
                access.server.spec.name_ssh_key_secret
            )
        })?;
        self.providers.for_server(&access.server, token)
    }

    /// SSH clone URL of a project on the server
    pub async fn repository_url(&self, access: &ServerAccess, project_path: &str) -> Result<String> {
        if access.is_gerrit() {
            return Ok(access.server.spec.ssh_url(project_path));
        }
        Ok(self
            .provider(access)?
            .repository_ssh_url(project_path)
            .await?)
    }

    /// Clone `url` into `directory` unless a checkout is already there
    pub async fn ensure_checkout(&self, url: &str, auth: &GitAuth, directory: &Path) -> Result<()> {
        if directory.join(".git").exists() {
            debug!(directory = %directory.display(), "Reusing existing checkout");
            return Ok(());
        }
        if let Some(parent) = directory.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.git.clone_repository(url, auth, directory).await
    }
}

/// Refspec pushing one local branch to the same remote branch
#[must_use]
pub fn branch_refspec(branch: &str) -> String {
    format!("refs/heads/{branch}:refs/heads/{branch}")
}
