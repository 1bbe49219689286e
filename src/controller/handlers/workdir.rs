//! Local working directory cleanup.
//!
//! The same step runs as `cleaner` at the end of provisioning chains and as
//! `remove-workdir` in deletion chains; only the directory differs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::debug;

use super::{SharedCollaborators, namespace_of};
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::workdir;
use crate::crd::{Codebase, CodebaseBranch};

pub const CLEANER: &str = "cleaner";
pub const REMOVE_WORKDIR: &str = "remove-workdir";

/// Maps the working directory root, namespace and entity to the directory to remove
pub type DirResolver<K> = fn(&Path, &str, &K) -> PathBuf;

pub struct RemoveWorkdir<K> {
    name: &'static str,
    collab: SharedCollaborators,
    resolve: DirResolver<K>,
}

impl<K> RemoveWorkdir<K> {
    pub fn new(name: &'static str, collab: SharedCollaborators, resolve: DirResolver<K>) -> Self {
        Self {
            name,
            collab,
            resolve,
        }
    }
}

impl RemoveWorkdir<Codebase> {
    /// Drop the provisioning checkout once a chain has finished with it
    pub fn codebase_cleaner(collab: SharedCollaborators) -> Self {
        Self::new(CLEANER, collab, |root, ns, cb| {
            workdir::repository_dir(root, ns, &cb.name_any())
        })
    }

    /// Drop everything kept locally for a deleted codebase
    pub fn codebase_removal(collab: SharedCollaborators) -> Self {
        Self::new(REMOVE_WORKDIR, collab, |root, ns, cb| {
            workdir::codebase_dir(root, ns, &cb.name_any())
        })
    }
}

impl RemoveWorkdir<CodebaseBranch> {
    fn branch_dir(root: &Path, namespace: &str, branch: &CodebaseBranch) -> PathBuf {
        workdir::branch_dir(
            root,
            namespace,
            &branch.spec.codebase_name,
            &branch.spec.branch_name,
        )
    }

    pub fn branch_cleaner(collab: SharedCollaborators) -> Self {
        Self::new(CLEANER, collab, Self::branch_dir)
    }

    pub fn branch_removal(collab: SharedCollaborators) -> Self {
        Self::new(REMOVE_WORKDIR, collab, Self::branch_dir)
    }
}

#[async_trait]
impl<K> Handler<K> for RemoveWorkdir<K>
where
    K: kube::Resource + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn serve_request(&self, _ctx: &RequestContext, entity: &mut K) -> Result<()> {
        let namespace = namespace_of(entity)?;
        let directory = (self.resolve)(&self.collab.config.working_dir, &namespace, entity);
        workdir::remove_dir(&directory).await?;
        debug!(directory = %directory.display(), "Removed working directory");
        Ok(())
    }
}
