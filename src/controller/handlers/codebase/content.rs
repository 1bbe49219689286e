//! Repository content pushed after the project exists.

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::Target;
use crate::constants::{DEFAULT_START_VERSION, GITLAB_CI_FILE, VERSION_FILE};
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::handlers::{Collaborators, SharedCollaborators};
use crate::controller::progress::ProgressMarker;
use crate::crd::Codebase;

pub const PUT_DEPLOY_CONFIGS: &str = "put-deploy-configs";
pub const PUT_VERSION_FILE: &str = "put-version-file";
pub const PUT_GITLAB_CI_FILE: &str = "put-gitlab-ci-file";

async fn skip_when_reached(
    collab: &Collaborators,
    codebase: &Codebase,
    milestone: ProgressMarker,
) -> Result<bool> {
    let reached = collab.progress.reached(codebase, milestone).await?;
    if reached {
        debug!(resource.name = %codebase.name_any(), milestone = %milestone, "Milestone reached, skipping");
    }
    Ok(reached)
}

/// Commit the checkout and push it when anything changed
async fn commit_and_push(
    collab: &Collaborators,
    codebase: &Codebase,
    target: &Target,
    url: &str,
    message: &str,
) -> Result<()> {
    if collab.git.commit_all(&target.checkout, message).await? {
        let refspec = format!("HEAD:refs/heads/{}", codebase.spec.default_branch);
        collab
            .git
            .push(&target.checkout, url, &target.access.auth, &refspec)
            .await?;
    }
    Ok(())
}

/// Render deployment templates into the repository
///
/// Codebases that opted out of templates, or whose language has none, only
/// have their marker advanced.
pub struct PutDeployConfigs {
    collab: SharedCollaborators,
}

impl PutDeployConfigs {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutDeployConfigs {
    fn name(&self) -> &'static str {
        PUT_DEPLOY_CONFIGS
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if skip_when_reached(&self.collab, codebase, ProgressMarker::TemplatesPushed).await? {
            return Ok(());
        }

        let spec = &codebase.spec;
        if spec.disable_put_deploy_templates || spec.empty_project || spec.language() == "other" {
            debug!(resource.name = %codebase.name_any(), "Deployment templates not wanted");
        } else {
            let target = self.collab.codebase_target(codebase).await?;
            let url = self.collab.codebase_checkout(&target).await?;
            let files = self
                .collab
                .templates
                .render(codebase, &target.checkout)
                .await?;
            commit_and_push(&self.collab, codebase, &target, &url, "Add deployment templates").await?;
            info!(resource.name = %codebase.name_any(), files = files, "Pushed deployment templates");
        }

        self.collab
            .progress
            .advance(codebase, ProgressMarker::TemplatesPushed)
            .await
    }
}

/// Write the `VERSION` file Go codebases derive their version from
pub struct PutVersionFile {
    collab: SharedCollaborators,
}

impl PutVersionFile {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutVersionFile {
    fn name(&self) -> &'static str {
        PUT_VERSION_FILE
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if skip_when_reached(&self.collab, codebase, ProgressMarker::VersionFilePushed).await? {
            return Ok(());
        }

        if codebase.spec.language() == "go" {
            let target = self.collab.codebase_target(codebase).await?;
            let url = self.collab.codebase_checkout(&target).await?;
            let path = target.checkout.join(VERSION_FILE);
            if !path.exists() {
                let version = codebase
                    .spec
                    .versioning
                    .start_from
                    .clone()
                    .unwrap_or_else(|| DEFAULT_START_VERSION.to_string());
                tokio::fs::write(&path, format!("{version}\n"))
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            commit_and_push(&self.collab, codebase, &target, &url, "Add VERSION file").await?;
        }

        self.collab
            .progress
            .advance(codebase, ProgressMarker::VersionFilePushed)
            .await
    }
}

/// Add a `.gitlab-ci.yml` unless the repository already has one
pub struct PutGitlabCiFile {
    collab: SharedCollaborators,
}

impl PutGitlabCiFile {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutGitlabCiFile {
    fn name(&self) -> &'static str {
        PUT_GITLAB_CI_FILE
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        if skip_when_reached(&self.collab, codebase, ProgressMarker::GitlabCiPushed).await? {
            return Ok(());
        }

        let target = self.collab.codebase_target(codebase).await?;
        let url = self.collab.codebase_checkout(&target).await?;
        let path = target.checkout.join(GITLAB_CI_FILE);
        if path.exists() {
            info!(resource.name = %codebase.name_any(), "Repository already has a GitLab CI file");
        } else {
            let content = self
                .collab
                .templates
                .gitlab_ci_template(&codebase.spec.lang, &codebase.spec.build_tool)
                .await?;
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            commit_and_push(&self.collab, codebase, &target, &url, "Add GitLab CI file").await?;
        }

        self.collab
            .progress
            .advance(codebase, ProgressMarker::GitlabCiPushed)
            .await
    }
}
