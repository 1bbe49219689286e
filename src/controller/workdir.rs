//! # Working Directories
//!
//! Local checkout layout under the configured working directory:
//!
//! ```text
//! <working_dir>/codebase-operator/<namespace>/<codebase>/repository
//! <working_dir>/codebase-operator/<namespace>/<codebase>/branches/<branch>
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::crd::sanitize_name;

const ROOT: &str = "codebase-operator";

/// Everything kept locally for one codebase
#[must_use]
pub fn codebase_dir(working_dir: &Path, namespace: &str, codebase: &str) -> PathBuf {
    working_dir.join(ROOT).join(namespace).join(codebase)
}

/// Checkout used by the codebase provisioning chains
#[must_use]
pub fn repository_dir(working_dir: &Path, namespace: &str, codebase: &str) -> PathBuf {
    codebase_dir(working_dir, namespace, codebase).join("repository")
}

/// Checkout used by one branch
#[must_use]
pub fn branch_dir(working_dir: &Path, namespace: &str, codebase: &str, branch: &str) -> PathBuf {
    codebase_dir(working_dir, namespace, codebase)
        .join("branches")
        .join(sanitize_name(branch))
}

/// Remove a directory tree; a missing directory is fine
pub async fn remove_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
