//! GitLab REST Client
//!
//! Implements `GitProvider` against the GitLab REST API v4.
//!
//! Projects are addressed by their URL-encoded full path
//! (`group/sub/project` → `group%2Fsub%2Fproject`).
//!
//! References:
//! - [Projects API](https://docs.gitlab.com/ee/api/projects.html)
//! - [Project webhooks API](https://docs.gitlab.com/ee/api/project_webhooks.html)

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span};

use super::{GitProvider, ProviderError, Webhook};
use crate::observability::metrics;

const PROVIDER: &str = "gitlab";

/// GitLab REST client
#[derive(Clone)]
pub struct GitLabProvider {
    http_client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for GitLabProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Project {
    ssh_url_to_repo: String,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    id: i64,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'a> {
    name: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace_id: Option<i64>,
    default_branch: &'a str,
    visibility: &'a str,
    initialize_with_readme: bool,
}

#[derive(Debug, Serialize)]
struct CreateHookRequest<'a> {
    url: &'a str,
    token: &'a str,
    push_events: bool,
    merge_requests_events: bool,
    note_events: bool,
    enable_ssl_verification: bool,
}

#[derive(Debug, Deserialize)]
struct Hook {
    id: i64,
    url: String,
}

impl GitLabProvider {
    /// Create a client for `base_url` (e.g. `https://gitlab.example.com`)
    pub fn new(base_url: &str, token: &str) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid GitLab URL {base_url}: {e}"))?;
        Ok(Self {
            http_client: Client::new(),
            base_url,
            token: token.to_string(),
        })
    }

    /// `<base>/api/v4/<segments...>` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| anyhow::anyhow!("GitLab URL cannot be a base"))?;
            path.pop_if_empty().extend(["api", "v4"]).extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    async fn get_project(&self, project_path: &str) -> Result<Project, ProviderError> {
        let url = self.endpoint(&["projects", project_id(project_path)])?;
        let response = self.request(Method::GET, url).send().await?;
        let response = check(response, project_path).await?;
        Ok(response.json().await?)
    }
}

/// Map error statuses; 404 becomes `NotFound`
async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    metrics::increment_provider_operation_errors(PROVIDER);
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(what.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Unexpected {
        status: status.as_u16(),
        body,
    })
}

/// Full path as GitLab addresses it, without surrounding slashes
fn project_id(project_path: &str) -> &str {
    project_path.trim_matches('/')
}

/// Split `group/sub/project` into namespace and project name
fn split_path(project_path: &str) -> (Option<&str>, &str) {
    let trimmed = project_path.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((namespace, name)) => (Some(namespace), name),
        None => (None, trimmed),
    }
}

#[async_trait]
impl GitProvider for GitLabProvider {
    async fn create_project(&self, project_path: &str, default_branch: &str) -> Result<(), ProviderError> {
        let span = info_span!("gitlab.project.create", project.path = project_path);
        async move {
            let start = Instant::now();
            let (namespace, name) = split_path(project_path);

            let namespace_id = match namespace {
                Some(ns) => {
                    let url = self.endpoint(&["namespaces", ns])?;
                    let response = self.request(Method::GET, url).send().await?;
                    let namespace: Namespace = check(response, ns).await?.json().await?;
                    Some(namespace.id)
                }
                None => None,
            };

            let url = self.endpoint(&["projects"])?;
            let body = CreateProjectRequest {
                name,
                path: name,
                namespace_id,
                default_branch,
                visibility: "private",
                initialize_with_readme: false,
            };
            let response = self.request(Method::POST, url).json(&body).send().await?;
            check(response, project_path).await?;

            metrics::record_provider_operation(PROVIDER, "create_project", start.elapsed().as_secs_f64());
            info!("Created GitLab project");
            Ok::<(), ProviderError>(())
        }
        .instrument(span)
        .await
    }

    async fn project_exists(&self, project_path: &str) -> Result<bool, ProviderError> {
        match self.get_project(project_path).await {
            Ok(_) => Ok(true),
            Err(ProviderError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn repository_ssh_url(&self, project_path: &str) -> Result<String, ProviderError> {
        Ok(self.get_project(project_path).await?.ssh_url_to_repo)
    }

    async fn create_webhook(
        &self,
        project_path: &str,
        url: &str,
        secret: &str,
    ) -> Result<i64, ProviderError> {
        let start = Instant::now();
        let endpoint = self.endpoint(&["projects", project_id(project_path), "hooks"])?;
        let body = CreateHookRequest {
            url,
            token: secret,
            push_events: true,
            merge_requests_events: true,
            note_events: true,
            enable_ssl_verification: false,
        };
        let response = self.request(Method::POST, endpoint).json(&body).send().await?;
        let hook: Hook = check(response, project_path).await?.json().await?;
        metrics::record_provider_operation(PROVIDER, "create_webhook", start.elapsed().as_secs_f64());
        debug!(project.path = project_path, webhook.id = hook.id, "Created GitLab webhook");
        Ok(hook.id)
    }

    async fn get_webhook(&self, project_path: &str, webhook_id: i64) -> Result<Webhook, ProviderError> {
        let id = webhook_id.to_string();
        let endpoint = self.endpoint(&["projects", project_id(project_path), "hooks", &id])?;
        let response = self.request(Method::GET, endpoint).send().await?;
        let hook: Hook = check(response, &format!("{project_path} hook {id}")).await?.json().await?;
        Ok(Webhook {
            id: hook.id,
            url: hook.url,
        })
    }

    async fn list_webhooks(&self, project_path: &str) -> Result<Vec<Webhook>, ProviderError> {
        let mut endpoint = self.endpoint(&["projects", project_id(project_path), "hooks"])?;
        endpoint.query_pairs_mut().append_pair("per_page", "100");
        let response = self.request(Method::GET, endpoint).send().await?;
        let hooks: Vec<Hook> = check(response, project_path).await?.json().await?;
        Ok(hooks
            .into_iter()
            .map(|hook| Webhook {
                id: hook.id,
                url: hook.url,
            })
            .collect())
    }

    async fn delete_webhook(&self, project_path: &str, webhook_id: i64) -> Result<(), ProviderError> {
        let id = webhook_id.to_string();
        let endpoint = self.endpoint(&["projects", project_id(project_path), "hooks", &id])?;
        let response = self.request(Method::DELETE, endpoint).send().await?;
        check(response, &format!("{project_path} hook {id}")).await?;
        Ok(())
    }
}
