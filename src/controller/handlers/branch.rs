//! # CodebaseBranch Handlers
//!
//! Provisioning waits for the parent codebase, pushes the branch and
//! creates its image stream. Deletion runs the Jenkins "delete release" job
//! for release branches.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use kube::api::ObjectMeta;
use tracing::{debug, info, warn};

use super::{SharedCollaborators, branch_refspec, namespace_of, owner_reference};
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::errors::{JobFailed, Postpone};
use crate::controller::progress::ProgressMarker;
use crate::controller::workdir;
use crate::crd::{Codebase, CodebaseBranch, CodebaseImageStream, CodebaseImageStreamSpec};
use crate::provider::JobStatus;
use crate::store::StoreError;

pub const CHECK_PARENT_CODEBASE: &str = "check-parent-codebase";
pub const PUT_BRANCH_IN_GIT: &str = "put-branch-in-git";
pub const PUT_CODEBASE_IMAGE_STREAM: &str = "put-codebase-image-stream";
pub const RUN_CLEANUP_JOB: &str = "run-cleanup-job";

/// Jenkins job removing release artifacts of a codebase
#[must_use]
pub fn cleanup_job_name(codebase: &str) -> String {
    format!("delete-release-{codebase}")
}

/// The parent codebase once it is provisioned, otherwise a postpone
async fn ready_parent(collab: &SharedCollaborators, branch: &CodebaseBranch) -> Result<Codebase> {
    let namespace = namespace_of(branch)?;
    let parent = collab
        .codebases
        .get(&namespace, &branch.spec.codebase_name)
        .await?;
    match parent {
        Some(codebase)
            if codebase
                .status
                .as_ref()
                .is_some_and(|s| s.common.available) =>
        {
            Ok(codebase)
        }
        Some(_) => Err(Postpone::new(
            collab.config.postpone_duration(),
            format!("codebase {} is not ready yet", branch.spec.codebase_name),
        )
        .into()),
        None => Err(Postpone::new(
            collab.config.postpone_duration(),
            format!("codebase {} does not exist yet", branch.spec.codebase_name),
        )
        .into()),
    }
}

pub struct CheckParentCodebase {
    collab: SharedCollaborators,
}

impl CheckParentCodebase {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for CheckParentCodebase {
    fn name(&self) -> &'static str {
        CHECK_PARENT_CODEBASE
    }

    async fn serve_request(&self, _ctx: &RequestContext, branch: &mut CodebaseBranch) -> Result<()> {
        ready_parent(&self.collab, branch).await.map(|_| ())
    }
}

/// Create the branch in the parent's repository
pub struct PutBranchInGit {
    collab: SharedCollaborators,
}

impl PutBranchInGit {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for PutBranchInGit {
    fn name(&self) -> &'static str {
        PUT_BRANCH_IN_GIT
    }

    async fn serve_request(&self, _ctx: &RequestContext, branch: &mut CodebaseBranch) -> Result<()> {
        let collab = &self.collab;
        if collab
            .progress
            .reached(branch, ProgressMarker::BranchPushed)
            .await?
        {
            debug!(branch = %branch.spec.branch_name, "Branch already pushed, skipping");
            return Ok(());
        }

        let codebase = ready_parent(collab, branch).await?;
        let namespace = namespace_of(branch)?;
        let access = collab
            .server_access(&namespace, &codebase.spec.git_server)
            .await?;
        let project_path = codebase.spec.project_path(&codebase.name_any());
        let url = collab.repository_url(&access, &project_path).await?;
        let name = branch.spec.branch_name.clone();

        if collab
            .git
            .remote_branch_exists(&url, &access.auth, &name)
            .await?
        {
            info!(branch = %name, "Branch already exists in repository");
        } else {
            let checkout = workdir::branch_dir(
                &collab.config.working_dir,
                &namespace,
                &branch.spec.codebase_name,
                &name,
            );
            collab.ensure_checkout(&url, &access.auth, &checkout).await?;
            collab
                .git
                .create_branch(&checkout, &name, &branch.spec.from_commit)
                .await?;
            collab
                .git
                .push(&checkout, &url, &access.auth, &branch_refspec(&name))
                .await?;
            info!(branch = %name, "Pushed branch");
        }

        collab
            .progress
            .advance(branch, ProgressMarker::BranchPushed)
            .await
    }
}

/// Get-or-create the image stream fed by this branch
pub struct PutCodebaseImageStream {
    collab: SharedCollaborators,
}

impl PutCodebaseImageStream {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for PutCodebaseImageStream {
    fn name(&self) -> &'static str {
        PUT_CODEBASE_IMAGE_STREAM
    }

    async fn serve_request(&self, _ctx: &RequestContext, branch: &mut CodebaseBranch) -> Result<()> {
        let namespace = namespace_of(branch)?;
        let name = branch.spec.image_stream_name();
        if self
            .collab
            .image_streams
            .get(&namespace, &name)
            .await?
            .is_some()
        {
            debug!(image_stream = %name, "CodebaseImageStream already exists");
            return Ok(());
        }

        let stream = CodebaseImageStream {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                owner_references: Some(vec![owner_reference(branch)?]),
                ..ObjectMeta::default()
            },
            spec: CodebaseImageStreamSpec {
                codebase: branch.spec.codebase_name.clone(),
                image_name: branch.spec.codebase_name.clone(),
                tags: Vec::new(),
            },
            status: None,
        };
        match self.collab.image_streams.create(&namespace, &stream).await {
            Ok(_) => info!(image_stream = %name, "Created CodebaseImageStream"),
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(image_stream = %name, "CodebaseImageStream created concurrently");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Run the "delete release" job of a release branch before it goes away
///
/// A job that was never run, or whose last build failed, is triggered; until
/// its last build succeeds the step fails with [`JobFailed`] and the finalizer
/// stays.
pub struct RunCleanupJob {
    collab: SharedCollaborators,
}

impl RunCleanupJob {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }

    async fn trigger(&self, job: &str, branch: &CodebaseBranch) -> Result<()> {
        let parameters = BTreeMap::from([
            ("RELEASE_NAME".to_string(), branch.spec.branch_name.clone()),
            ("CODEBASE_NAME".to_string(), branch.spec.codebase_name.clone()),
        ]);
        self.collab.jobs.trigger_job(job, &parameters).await
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for RunCleanupJob {
    fn name(&self) -> &'static str {
        RUN_CLEANUP_JOB
    }

    async fn serve_request(&self, _ctx: &RequestContext, branch: &mut CodebaseBranch) -> Result<()> {
        if !branch.spec.release {
            return Ok(());
        }

        let job = cleanup_job_name(&branch.spec.codebase_name);
        match self.collab.jobs.job_status(&job).await? {
            JobStatus::Missing => {
                debug!(job = %job, "No cleanup job configured");
                Ok(())
            }
            JobStatus::Succeeded => {
                info!(job = %job, "Cleanup job finished");
                Ok(())
            }
            JobStatus::NotStarted => {
                self.trigger(&job, branch).await?;
                Err(JobFailed::StillRunning { job }.into())
            }
            JobStatus::Running => Err(JobFailed::StillRunning { job }.into()),
            JobStatus::Failed(message) => {
                // Each retry of the deletion runs the job again
                warn!(job = %job, result = %message, "Cleanup job failed, triggering it again");
                self.trigger(&job, branch).await?;
                Err(JobFailed::Failed { job, message }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_job_name() {
        assert_eq!(cleanup_job_name("payments"), "delete-release-payments");
    }
}
