//! # Codebase Handlers
//!
//! - `project`: create, clone or adopt the repository (`pushed`)
//! - `content`: deployment templates, version file and GitLab CI file
//! - `webhook`: repository webhook registration and removal
//! - `registrations`: JenkinsFolder and default CodebaseBranch objects

mod content;
mod project;
mod registrations;
mod webhook;

pub use content::{PutDeployConfigs, PutGitlabCiFile, PutVersionFile};
pub use project::{CheckProjectExists, PutProject, PutProjectGerrit};
pub use registrations::{PutDefaultBranch, PutJenkinsFolder, default_branch_name};
pub use webhook::{DeleteWebHook, PutWebHook};

use std::path::PathBuf;

use anyhow::Result;
use kube::ResourceExt;

use super::{Collaborators, ServerAccess, namespace_of};
use crate::controller::workdir;
use crate::crd::Codebase;

/// What most codebase steps need: where the repository lives and how to reach it
pub(crate) struct Target {
    pub access: ServerAccess,
    pub project_path: String,
    pub checkout: PathBuf,
}

impl Collaborators {
    pub(crate) async fn codebase_target(&self, codebase: &Codebase) -> Result<Target> {
        let namespace = namespace_of(codebase)?;
        let name = codebase.name_any();
        let access = self
            .server_access(&namespace, &codebase.spec.git_server)
            .await?;
        Ok(Target {
            access,
            project_path: codebase.spec.project_path(&name),
            checkout: workdir::repository_dir(&self.config.working_dir, &namespace, &name),
        })
    }

    /// Make sure the provisioning checkout of a codebase exists
    pub(crate) async fn codebase_checkout(&self, target: &Target) -> Result<String> {
        let url = self
            .repository_url(&target.access, &target.project_path)
            .await?;
        self.ensure_checkout(&url, &target.access.auth, &target.checkout)
            .await?;
        Ok(url)
    }
}
