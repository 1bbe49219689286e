//! # Gerrit
//!
//! Project administration over the Gerrit SSH command interface.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::info;

use super::ssh::SshKeyFile;
use super::{GerritAccess, GerritClient};

#[derive(Debug, Clone)]
pub struct GerritSsh {
    key_dir: PathBuf,
}

impl GerritSsh {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
        }
    }

    async fn gerrit(&self, access: &GerritAccess, args: &[&str]) -> Result<String> {
        let key = SshKeyFile::write(&access.private_key, &self.key_dir).await?;
        let output = tokio::process::Command::new("ssh")
            .arg("-i")
            .arg(key.path())
            .args(["-o", "StrictHostKeyChecking=no", "-o", "UserKnownHostsFile=/dev/null"])
            .arg("-p")
            .arg(access.port.to_string())
            .arg(format!("{}@{}", access.user, access.host))
            .arg("gerrit")
            .args(args)
            .output()
            .await
            .context("Failed to execute ssh")?;

        if !output.status.success() {
            bail!(
                "gerrit {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl GerritClient for GerritSsh {
    async fn project_exists(&self, access: &GerritAccess, project: &str) -> Result<bool> {
        let listing = self.gerrit(access, &["ls-projects"]).await?;
        Ok(listing.lines().any(|line| line.trim() == project))
    }

    async fn create_project(&self, access: &GerritAccess, project: &str) -> Result<()> {
        self.gerrit(access, &["create-project", project]).await?;
        info!(project = project, host = %access.host, "Created Gerrit project");
        Ok(())
    }
}
