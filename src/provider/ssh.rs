//! SSH key material for git and Gerrit commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A private key written to disk for the lifetime of one command
///
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub(crate) struct SshKeyFile {
    path: PathBuf,
}

impl SshKeyFile {
    /// Write `private_key` under `<base_dir>/.ssh/` with 0600 permissions
    pub(crate) async fn write(private_key: &str, base_dir: &Path) -> Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let ssh_dir = base_dir.join(".ssh");
        tokio::fs::create_dir_all(&ssh_dir)
            .await
            .context("Failed to create .ssh directory")?;

        let path = ssh_dir.join(format!("id_rsa-{}", uuid::Uuid::new_v4()));
        let mut key = private_key.to_string();
        if !key.ends_with('\n') {
            key.push('\n');
        }
        tokio::fs::write(&path, key)
            .await
            .context("Failed to write SSH private key")?;

        // Set permissions to 600 (read/write for owner only)
        let mut perms = tokio::fs::metadata(&path)
            .await
            .context("Failed to get SSH key metadata")?
            .permissions();
        perms.set_mode(0o600);
        tokio::fs::set_permissions(&path, perms)
            .await
            .context("Failed to set SSH key permissions")?;

        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Value for `GIT_SSH_COMMAND`
    pub(crate) fn git_ssh_command(&self) -> String {
        format!(
            "ssh -i {} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null",
            self.path.display()
        )
    }
}

impl Drop for SshKeyFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
