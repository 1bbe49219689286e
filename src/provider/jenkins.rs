//! Jenkins REST Client
//!
//! Reads the last build of a job and triggers parameterised builds.
//! Nested jobs are addressed as `folder/job`, mapped to
//! `/job/folder/job/job` in the URL.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::info;

use super::{JobRunner, JobStatus};
use crate::observability::metrics;

const PROVIDER: &str = "jenkins";

#[derive(Clone)]
pub struct JenkinsClient {
    http_client: Client,
    base_url: Url,
    user: Option<String>,
    token: Option<String>,
}

impl std::fmt::Debug for JenkinsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsClient")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Build {
    #[serde(default)]
    building: bool,
    #[serde(default)]
    result: Option<String>,
}

impl JenkinsClient {
    pub fn new(base_url: &str, user: Option<String>, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid Jenkins URL {base_url}"))?;
        Ok(Self {
            http_client: Client::new(),
            base_url,
            user,
            token,
        })
    }

    fn job_url(&self, job: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| anyhow::anyhow!("Jenkins URL cannot be a base"))?;
            path.pop_if_empty();
            for part in job.split('/').filter(|p| !p.is_empty()) {
                path.push("job").push(part);
            }
            path.extend(tail);
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => request.basic_auth(user, self.token.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl JobRunner for JenkinsClient {
    async fn job_status(&self, job: &str) -> Result<JobStatus> {
        let url = self.job_url(job, &["lastBuild", "api", "json"])?;
        let response = self
            .authorize(self.http_client.get(url))
            .send()
            .await
            .context("Failed to query Jenkins build")?;

        if response.status() == StatusCode::NOT_FOUND {
            // No last build: either the job is missing or it never ran
            let url = self.job_url(job, &["api", "json"])?;
            let job_response = self
                .authorize(self.http_client.get(url))
                .send()
                .await
                .context("Failed to query Jenkins job")?;
            return match job_response.status() {
                StatusCode::NOT_FOUND => Ok(JobStatus::Missing),
                s if s.is_success() => Ok(JobStatus::NotStarted),
                s => {
                    metrics::increment_provider_operation_errors(PROVIDER);
                    bail!("Jenkins returned {s} for job {job}")
                }
            };
        }
        if !response.status().is_success() {
            metrics::increment_provider_operation_errors(PROVIDER);
            bail!("Jenkins returned {} for job {job}", response.status());
        }

        let build: Build = response
            .json()
            .await
            .context("Failed to parse Jenkins build")?;
        Ok(match (build.building, build.result.as_deref()) {
            (true, _) | (false, None) => JobStatus::Running,
            (false, Some("SUCCESS")) => JobStatus::Succeeded,
            (false, Some(other)) => JobStatus::Failed(other.to_string()),
        })
    }

    async fn trigger_job(&self, job: &str, parameters: &BTreeMap<String, String>) -> Result<()> {
        let url = self.job_url(job, &["buildWithParameters"])?;
        let response = self
            .authorize(self.http_client.post(url).query(parameters))
            .send()
            .await
            .context("Failed to trigger Jenkins job")?;
        if !response.status().is_success() {
            metrics::increment_provider_operation_errors(PROVIDER);
            bail!("Jenkins returned {} when triggering {job}", response.status());
        }
        info!(job = job, "Triggered Jenkins job");
        Ok(())
    }
}

/// Job runner used when no Jenkins is configured: every job is missing
#[derive(Debug, Clone, Default)]
pub struct NoopJobRunner;

#[async_trait]
impl JobRunner for NoopJobRunner {
    async fn job_status(&self, _job: &str) -> Result<JobStatus> {
        Ok(JobStatus::Missing)
    }

    async fn trigger_job(&self, job: &str, _parameters: &BTreeMap<String, String>) -> Result<()> {
        bail!("cannot trigger {job}: no Jenkins configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_job_url() {
        let client = JenkinsClient::new("https://jenkins.example.com", None, None).unwrap();
        let url = client
            .job_url("payments/delete-release-payments", &["lastBuild", "api", "json"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://jenkins.example.com/job/payments/job/delete-release-payments/lastBuild/api/json"
        );
    }
}
