//! Repository webhooks on hosted git providers.
//!
//! The shared webhook secret lives in the git server's secret under
//! `secretString`. It is generated once, persisted before any webhook is
//! registered with it, and reused by every codebase on that server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::constants::SECRET_KEY_WEBHOOK_SECRET;
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::handlers::{
    Collaborators, ServerAccess, SharedCollaborators, namespace_of, secret_value,
};
use crate::crd::Codebase;

pub const PUT_WEBHOOK: &str = "put-webhook";
pub const DELETE_WEBHOOK: &str = "delete-webhook";

impl Collaborators {
    /// Webhook secret of a git server, generated and stored on first use
    pub async fn webhook_secret(&self, access: &ServerAccess) -> Result<String> {
        if let Some(token) = secret_value(&access.secret, SECRET_KEY_WEBHOOK_SECRET) {
            return Ok(token);
        }

        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut secret = access.secret.clone();
        secret
            .data
            .get_or_insert_with(Default::default)
            .insert(
                SECRET_KEY_WEBHOOK_SECRET.to_string(),
                ByteString(token.as_bytes().to_vec()),
            );
        self.secrets
            .replace(&secret)
            .await
            .with_context(|| format!("Failed to store webhook secret in {}", secret.name_any()))?;
        info!(secret = %secret.name_any(), "Generated webhook secret");
        Ok(token)
    }

    fn webhook_url(&self, access: &ServerAccess) -> Result<String> {
        access
            .server
            .spec
            .webhook_url
            .clone()
            .or_else(|| self.config.webhook_base_url.clone())
            .with_context(|| {
                format!(
                    "git server {} has no webhookUrl and WEBHOOK_BASE_URL is not set",
                    access.server.name_any()
                )
            })
    }
}

/// Register the push/merge webhook of a codebase
///
/// A stored webhook id that still resolves on the provider means there is
/// nothing to do; a stale id is replaced.
pub struct PutWebHook {
    collab: SharedCollaborators,
}

impl PutWebHook {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for PutWebHook {
    fn name(&self) -> &'static str {
        PUT_WEBHOOK
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        let target = self.collab.codebase_target(codebase).await?;
        if target.access.is_gerrit() {
            debug!(resource.name = %codebase.name_any(), "Gerrit triggers builds without webhooks");
            return Ok(());
        }
        let provider = self.collab.provider(&target.access)?;

        if let Some(id) = codebase.status.as_ref().and_then(|s| s.webhook_id) {
            match provider.get_webhook(&target.project_path, id).await {
                Ok(_) => {
                    debug!(webhook_id = id, "Webhook already registered");
                    return Ok(());
                }
                Err(e) if e.is_not_found() => {
                    warn!(webhook_id = id, "Registered webhook is gone, creating a new one");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let url = self.collab.webhook_url(&target.access)?;

        // The id may have been lost with an unpersisted status
        let existing = provider
            .list_webhooks(&target.project_path)
            .await?
            .into_iter()
            .find(|hook| hook.url == url);
        let id = if let Some(hook) = existing {
            info!(project = %target.project_path, webhook_id = hook.id, "Adopted registered webhook");
            hook.id
        } else {
            let secret = self.collab.webhook_secret(&target.access).await?;
            let id = provider
                .create_webhook(&target.project_path, &url, &secret)
                .await?;
            info!(project = %target.project_path, webhook_id = id, "Registered webhook");
            id
        };
        codebase
            .status
            .get_or_insert_with(Default::default)
            .webhook_id = Some(id);
        Ok(())
    }
}

/// Remove the webhook of a deleted codebase
///
/// A webhook or git server that is already gone is not an error.
pub struct DeleteWebHook {
    collab: SharedCollaborators,
}

impl DeleteWebHook {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<Codebase> for DeleteWebHook {
    fn name(&self) -> &'static str {
        DELETE_WEBHOOK
    }

    async fn serve_request(&self, _ctx: &RequestContext, codebase: &mut Codebase) -> Result<()> {
        let Some(id) = codebase.status.as_ref().and_then(|s| s.webhook_id) else {
            return Ok(());
        };
        let namespace = namespace_of(codebase)?;
        if self
            .collab
            .git_servers
            .get(&namespace, &codebase.spec.git_server)
            .await?
            .is_none()
        {
            warn!(
                git_server = %codebase.spec.git_server,
                "Git server is gone, leaving webhook in place"
            );
            return Ok(());
        }

        let target = self.collab.codebase_target(codebase).await?;
        let provider = self.collab.provider(&target.access)?;
        match provider.delete_webhook(&target.project_path, id).await {
            Ok(()) => info!(project = %target.project_path, webhook_id = id, "Deleted webhook"),
            Err(e) if e.is_not_found() => {
                debug!(webhook_id = id, "Webhook already deleted");
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(status) = codebase.status.as_mut() {
            status.webhook_id = None;
        }
        Ok(())
    }
}
