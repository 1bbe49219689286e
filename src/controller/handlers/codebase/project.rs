//! Repository creation.
//!
//! All three steps finish at the `pushed` milestone and skip once it is reached.
//! Projects are looked up before they are created, so a retried step never
//! creates a second project.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::Target;
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::handlers::{Collaborators, ServerAccess, SharedCollaborators};
use crate::controller::progress::ProgressMarker;
use crate::crd::{Codebase, Strategy};
use crate::provider::GitAuth;

pub const PUT_PROJECT_GERRIT: &str = "put-project-gerrit";
pub const PUT_PROJECT: &str = "put-project";
pub const CHECK_PROJECT_EXISTS: &str = "check-project-exists";

const README: &str = "README.md";

/// Prepare the local content of a new project and return the refspec to push
///
/// `clone` copies the upstream repository, `create` starts from a README.
async fn seed_repository(collab: &Collaborators, codebase: &Codebase, target: &Target) -> Result<String> {
    let spec = &codebase.spec;
    let refspec = format!("HEAD:refs/heads/{}", spec.default_branch);

    if spec.strategy == Strategy::Clone {
        let upstream = spec
            .repository
            .as_ref()
            .map(|r| r.url.as_str())
            .filter(|url| !url.is_empty())
            .context("clone strategy requires repository.url")?;
        collab
            .ensure_checkout(upstream, &GitAuth::None, &target.checkout)
            .await?;
        return Ok(refspec);
    }

    let checkout = &target.checkout;
    if !checkout.join(".git").exists() {
        tokio::fs::create_dir_all(checkout)
            .await
            .with_context(|| format!("Failed to create {}", checkout.display()))?;
        collab
            .git
            .init_repository(checkout, &spec.default_branch)
            .await?;
    }

    let readme = checkout.join(README);
    if !readme.exists() {
        let mut content = format!("# {}\n", codebase.name_any());
        if let Some(description) = spec.description.as_deref().filter(|d| !d.is_empty()) {
            content.push('\n');
            content.push_str(description);
            content.push('\n');
        }
        tokio::fs::write(&readme, content)
            .await
            .with_context(|| format!("Failed to write {}", readme.display()))?;
    }
    collab.git.commit_all(checkout, "Initial commit").await?;
    Ok(refspec)
}

async fn already_pushed(collab: &Collaborators, codebase: &Codebase) -> Result<bool> {
    let pushed = collab
        .progress
        .reached(codebase, ProgressMarker::Pushed)
        .await?;
    if pushed {
        debug!(resource.name = %codebase.name_any(), "Project already pushed, skipping");
    }
    Ok(pushed)
}

fn record_web_url(codebase: &mut Codebase, access: &ServerAccess, project_path: &str) {
    codebase
        .status
        .get_or_insert_with(Default::default)
        .git_web_url = Some(access.web_url(project_path));
}

/// Create the project on a Gerrit server and push its initial content
pub struct PutProjectGerrit {
    collab: SharedCollaborators,
}

impl PutProjectGerrit {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutProjectGerrit {
    fn name(&self) -> &'static str {
        PUT_PROJECT_GERRIT
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if already_pushed(&self.collab, codebase).await? {
            return Ok(());
        }

        let target = self.collab.codebase_target(codebase).await?;
        let gerrit = target.access.gerrit_access()?;
        if self
            .collab
            .gerrit
            .project_exists(&gerrit, &target.project_path)
            .await?
        {
            info!(project = %target.project_path, "Gerrit project already exists");
        } else {
            self.collab
                .gerrit
                .create_project(&gerrit, &target.project_path)
                .await?;
            info!(project = %target.project_path, "Created Gerrit project");
        }

        let refspec = seed_repository(&self.collab, codebase, &target).await?;
        let url = target.access.server.spec.ssh_url(&target.project_path);
        self.collab
            .git
            .push(&target.checkout, &url, &target.access.auth, &refspec)
            .await?;

        record_web_url(codebase, &target.access, &target.project_path);
        self.collab
            .progress
            .advance(codebase, ProgressMarker::Pushed)
            .await
    }
}

/// Create the project on a hosted git provider and push its initial content
pub struct PutProject {
    collab: SharedCollaborators,
}

impl PutProject {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutProject {
    fn name(&self) -> &'static str {
        PUT_PROJECT
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if already_pushed(&self.collab, codebase).await? {
            return Ok(());
        }

        let target = self.collab.codebase_target(codebase).await?;
        let provider = self.collab.provider(&target.access)?;
        if provider.project_exists(&target.project_path).await? {
            info!(project = %target.project_path, "Project already exists on git provider");
        } else {
            provider
                .create_project(&target.project_path, &codebase.spec.default_branch)
                .await?;
            info!(
                project = %target.project_path,
                provider = %target.access.kind(),
                "Created project"
            );
        }

        let refspec = seed_repository(&self.collab, codebase, &target).await?;
        let url = provider.repository_ssh_url(&target.project_path).await?;
        self.collab
            .git
            .push(&target.checkout, &url, &target.access.auth, &refspec)
            .await?;

        record_web_url(codebase, &target.access, &target.project_path);
        self.collab
            .progress
            .advance(codebase, ProgressMarker::Pushed)
            .await
    }
}

/// Adopt an existing project (import strategy)
pub struct CheckProjectExists {
    collab: SharedCollaborators,
}

impl CheckProjectExists {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for CheckProjectExists {
    fn name(&self) -> &'static str {
        CHECK_PROJECT_EXISTS
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if already_pushed(&self.collab, codebase).await? {
            return Ok(());
        }

        let target = self.collab.codebase_target(codebase).await?;
        let exists = if target.access.is_gerrit() {
            let gerrit = target.access.gerrit_access()?;
            self.collab
                .gerrit
                .project_exists(&gerrit, &target.project_path)
                .await?
        } else {
            self.collab
                .provider(&target.access)?
                .project_exists(&target.project_path)
                .await?
        };
        if !exists {
            bail!(
                "project {} does not exist on git server {}",
                target.project_path,
                codebase.spec.git_server
            );
        }

        record_web_url(codebase, &target.access, &target.project_path);
        self.collab
            .progress
            .advance(codebase, ProgressMarker::Pushed)
            .await
    }
}
