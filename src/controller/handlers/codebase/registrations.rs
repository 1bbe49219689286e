//! Downstream objects owned by a codebase.
//!
//! Both are get-or-create by deterministic name; an existing object is left
//! untouched.

use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use kube::api::ObjectMeta;
use tracing::{debug, info};

use crate::controller::chain::{Handler, RequestContext};
use crate::controller::handlers::{SharedCollaborators, namespace_of, owner_reference};
use crate::crd::{
    Codebase, CodebaseBranch, CodebaseBranchSpec, JenkinsFolder, JenkinsFolderSpec,
    jenkins_folder_name, sanitize_name,
};
use crate::store::StoreError;

pub const PUT_JENKINS_FOLDER: &str = "put-jenkins-folder";
pub const PUT_DEFAULT_BRANCH: &str = "put-default-branch";

/// Name of the CodebaseBranch tracking a codebase's default branch
#[must_use]
pub fn default_branch_name(codebase: &Codebase) -> String {
    format!(
        "{}-{}",
        codebase.name_any(),
        sanitize_name(&codebase.spec.default_branch)
    )
}

pub struct PutJenkinsFolder {
    collab: SharedCollaborators,
}

impl PutJenkinsFolder {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutJenkinsFolder {
    fn name(&self) -> &'static str {
        PUT_JENKINS_FOLDER
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        let namespace = namespace_of(codebase)?;
        let name = jenkins_folder_name(&codebase.name_any());
        if self
            .collab
            .jenkins_folders
            .get(&namespace, &name)
            .await?
            .is_some()
        {
            debug!(jenkins_folder = %name, "JenkinsFolder already exists");
            return Ok(());
        }

        let folder = JenkinsFolder {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                owner_references: Some(vec![owner_reference(codebase)?]),
                ..ObjectMeta::default()
            },
            spec: JenkinsFolderSpec {
                codebase_name: codebase.name_any(),
                job_name: codebase.spec.job_provisioning.clone(),
            },
        };
        match self.collab.jenkins_folders.create(&namespace, &folder).await {
            Ok(_) => info!(jenkins_folder = %name, "Created JenkinsFolder"),
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(jenkins_folder = %name, "JenkinsFolder created concurrently");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Track the default branch as a CodebaseBranch
pub struct PutDefaultBranch {
    collab: SharedCollaborators,
}

impl PutDefaultBranch {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutDefaultBranch {
    fn name(&self) -> &'static str {
        PUT_DEFAULT_BRANCH
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        let namespace = namespace_of(codebase)?;
        let name = default_branch_name(codebase);
        if self.collab.branches.get(&namespace, &name).await?.is_some() {
            debug!(branch = %name, "Default CodebaseBranch already exists");
            return Ok(());
        }

        let branch = CodebaseBranch {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                owner_references: Some(vec![owner_reference(codebase)?]),
                ..ObjectMeta::default()
            },
            spec: CodebaseBranchSpec {
                codebase_name: codebase.name_any(),
                branch_name: codebase.spec.default_branch.clone(),
                from_commit: String::new(),
                release: false,
                version: None,
            },
            status: None,
        };
        match self.collab.branches.create(&namespace, &branch).await {
            Ok(_) => info!(branch = %name, "Created default CodebaseBranch"),
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(branch = %name, "Default CodebaseBranch created concurrently");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
