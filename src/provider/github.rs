//! GitHub REST Client
//!
//! Implements `GitProvider` against the GitHub REST API (github.com or
//! GitHub Enterprise at `<host>/api/v3`).
//!
//! Project paths are `owner/repository`.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{GitProvider, ProviderError, Webhook};
use crate::observability::metrics;

const PROVIDER: &str = "github";
const USER_AGENT: &str = "codebase-operator";

/// GitHub REST client
#[derive(Clone)]
pub struct GitHubProvider {
    http_client: Client,
    api_url: Url,
    token: String,
}

impl std::fmt::Debug for GitHubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubProvider")
            .field("api_url", &self.api_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Repository {
    ssh_url: String,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryRequest<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Serialize)]
struct CreateHookRequest<'a> {
    name: &'a str,
    active: bool,
    events: &'a [&'a str],
    config: HookConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct HookConfig {
    #[serde(default)]
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hook {
    id: i64,
    config: HookConfig,
}

impl GitHubProvider {
    /// Create a client for an API root (`https://api.github.com` or
    /// `https://ghe.example.com/api/v3`)
    pub fn new(api_url: &str, token: &str) -> Result<Self, ProviderError> {
        let api_url =
            Url::parse(api_url).map_err(|e| anyhow::anyhow!("invalid GitHub URL {api_url}: {e}"))?;
        Ok(Self {
            http_client: Client::new(),
            api_url,
            token: token.to_string(),
        })
    }

    /// API root for a git host
    #[must_use]
    pub fn api_url_for_host(https_base: &str, host: &str) -> String {
        if host == "github.com" {
            "https://api.github.com".to_string()
        } else {
            format!("{https_base}/api/v3")
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.api_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| anyhow::anyhow!("GitHub URL cannot be a base"))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn get_repository(&self, project_path: &str) -> Result<Repository, ProviderError> {
        let (owner, repo) = split_path(project_path)?;
        let url = self.endpoint(&["repos", owner, repo])?;
        let response = self.request(Method::GET, url).send().await?;
        Ok(check(response, project_path).await?.json().await?)
    }
}

fn split_path(project_path: &str) -> Result<(&str, &str), ProviderError> {
    project_path
        .trim_matches('/')
        .split_once('/')
        .ok_or_else(|| anyhow::anyhow!("GitHub project path must be owner/repository: {project_path}").into())
}

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

#[async_trait]
impl GitProvider for GitHubProvider {
    async fn create_project(&self, project_path: &str, _default_branch: &str) -> Result<(), ProviderError> {
        let start = Instant::now();
        let (owner, repo) = split_path(project_path)?;
        let body = CreateRepositoryRequest {
            name: repo,
            private: true,
            auto_init: false,
        };

        // Organisation first; a 404 means the owner is a user account
        let url = self.endpoint(&["orgs", owner, "repos"])?;
        let response = self.request(Method::POST, url).json(&body).send().await?;
        match check(response, owner).await {
            Ok(_) => {}
            Err(ProviderError::NotFound(_)) => {
                let url = self.endpoint(&["user", "repos"])?;
                let response = self.request(Method::POST, url).json(&body).send().await?;
                check(response, project_path).await?;
            }
            Err(e) => return Err(e),
        }

        metrics::record_provider_operation(PROVIDER, "create_project", start.elapsed().as_secs_f64());
        info!(project.path = project_path, "Created GitHub repository");
        Ok(())
    }

    async fn project_exists(&self, project_path: &str) -> Result<bool, ProviderError> {
        match self.get_repository(project_path).await {
            Ok(_) => Ok(true),
            Err(ProviderError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn repository_ssh_url(&self, project_path: &str) -> Result<String, ProviderError> {
        Ok(self.get_repository(project_path).await?.ssh_url)
    }

    async fn create_webhook(
        &self,
        project_path: &str,
        url: &str,
        secret: &str,
    ) -> Result<i64, ProviderError> {
        let start = Instant::now();
        let (owner, repo) = split_path(project_path)?;
        let endpoint = self.endpoint(&["repos", owner, repo, "hooks"])?;
        let body = CreateHookRequest {
            name: "web",
            active: true,
            events: &["push", "pull_request", "issue_comment"],
            config: HookConfig {
                url: url.to_string(),
                content_type: Some("json".to_string()),
                secret: Some(secret.to_string()),
            },
        };
        let response = self.request(Method::POST, endpoint).json(&body).send().await?;
        let hook: Hook = check(response, project_path).await?.json().await?;
        metrics::record_provider_operation(PROVIDER, "create_webhook", start.elapsed().as_secs_f64());
        debug!(project.path = project_path, webhook.id = hook.id, "Created GitHub webhook");
        Ok(hook.id)
    }

    async fn get_webhook(&self, project_path: &str, webhook_id: i64) -> Result<Webhook, ProviderError> {
        let (owner, repo) = split_path(project_path)?;
        let id = webhook_id.to_string();
        let endpoint = self.endpoint(&["repos", owner, repo, "hooks", &id])?;
        let response = self.request(Method::GET, endpoint).send().await?;
        let hook: Hook = check(response, &format!("{project_path} hook {id}")).await?.json().await?;
        Ok(Webhook {
            id: hook.id,
            url: hook.config.url,
        })
    }

    async fn list_webhooks(&self, project_path: &str) -> Result<Vec<Webhook>, ProviderError> {
        let (owner, repo) = split_path(project_path)?;
        let mut endpoint = self.endpoint(&["repos", owner, repo, "hooks"])?;
        endpoint.query_pairs_mut().append_pair("per_page", "100");
        let response = self.request(Method::GET, endpoint).send().await?;
        let hooks: Vec<Hook> = check(response, project_path).await?.json().await?;
        Ok(hooks
            .into_iter()
            .map(|hook| Webhook {
                id: hook.id,
                url: hook.config.url,
            })
            .collect())
    }

    async fn delete_webhook(&self, project_path: &str, webhook_id: i64) -> Result<(), ProviderError> {
        let (owner, repo) = split_path(project_path)?;
        let id = webhook_id.to_string();
        let endpoint = self.endpoint(&["repos", owner, repo, "hooks", &id])?;
        let response = self.request(Method::DELETE, endpoint).send().await?;
        check(response, &format!("{project_path} hook {id}")).await?;
        Ok(())
    }
}
