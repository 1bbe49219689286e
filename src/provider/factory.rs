//! Provider client construction from `GitServer` resources.

use std::sync::Arc;

use anyhow::{Result, bail};

use super::{GitHubProvider, GitLabProvider, GitProvider, GitProviderFactory};
use crate::crd::{GitProviderKind, GitServer};

/// Builds REST clients for GitLab and GitHub servers
#[derive(Debug, Clone, Default)]
pub struct HttpProviderFactory;

impl GitProviderFactory for HttpProviderFactory {
    fn for_server(&self, server: &GitServer, token: &str) -> Result<Arc<dyn GitProvider>> {
        let spec = &server.spec;
        match spec.git_provider {
            GitProviderKind::Gitlab => Ok(Arc::new(GitLabProvider::new(&spec.https_base(), token)?)),
            GitProviderKind::Github => {
                let api = GitHubProvider::api_url_for_host(&spec.https_base(), &spec.git_host);
                Ok(Arc::new(GitHubProvider::new(&api, token)?))
            }
            other => bail!("git provider {other} has no REST integration"),
        }
    }
}
