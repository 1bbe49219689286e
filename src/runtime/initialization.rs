//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, Kubernetes client setup and the handler collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info};

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::constants;
use crate::controller::handlers::{Collaborators, SharedCollaborators};
use crate::controller::progress::{PgProgressStore, ProgressTracker};
use crate::controller::templates::DeployTemplates;
use crate::observability;
use crate::provider::{
    GerritSsh, GitCli, HttpProviderFactory, JenkinsClient, JobRunner, NoopJobRunner,
};
use crate::server::{ServerState, start_server};
use crate::store::KubeStore;

/// Everything the watch loops need
pub struct InitializationResult {
    pub client: Client,
    pub config: SharedControllerConfig,
    pub collaborators: SharedCollaborators,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("default_namespace", &self.client.default_namespace())
            .field("watch_namespace", &self.config.watch_namespace)
            .field("ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// - rustls crypto provider
/// - tracing subscriber and metrics registry
/// - HTTP server for metrics and probes
/// - Kubernetes client
/// - progress store, git clients, provider factory and job runner
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = Arc::new(ControllerConfig::from_env());
    observability::logging::init_tracing(&config.log_level, &config.log_format)?;

    info!("Starting codebase operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let collaborators = Arc::new(build_collaborators(&client, Arc::clone(&config)).await?);

    info!(
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        webhook_enabled = config.enable_webhook,
        "Controller initialized, starting watch loops..."
    );

    Ok(InitializationResult {
        client,
        config,
        collaborators,
        server_state,
    })
}

/// Wire the handler collaborators against the cluster and the environment
pub async fn build_collaborators(
    client: &Client,
    config: SharedControllerConfig,
) -> Result<Collaborators> {
    let progress = match &config.database_url {
        Some(url) => {
            let store = PgProgressStore::connect(url).await?;
            ProgressTracker::external(Arc::new(store), config.progress_scope.clone())
        }
        None => {
            info!("DATABASE_URL not set, keeping progress markers in entity status");
            ProgressTracker::Status
        }
    };

    let jobs: Arc<dyn JobRunner> = match &config.jenkins_url {
        Some(url) => Arc::new(JenkinsClient::new(
            url,
            config.jenkins_user.clone(),
            config.jenkins_token.clone(),
        )?),
        None => {
            info!("JENKINS_URL not set, release cleanup jobs are skipped");
            Arc::new(NoopJobRunner)
        }
    };

    let key_dir = config.working_dir.join(constants::SSH_KEY_DIR);
    Ok(Collaborators {
        git: Arc::new(GitCli::new(key_dir.clone())),
        gerrit: Arc::new(GerritSsh::new(key_dir)),
        providers: Arc::new(HttpProviderFactory),
        jobs,
        progress,
        templates: DeployTemplates::new(config.assets_dir.clone()),
        git_servers: Arc::new(KubeStore::new(client.clone())),
        secrets: Arc::new(KubeStore::new(client.clone())),
        codebases: Arc::new(KubeStore::new(client.clone())),
        branches: Arc::new(KubeStore::new(client.clone())),
        image_streams: Arc::new(KubeStore::new(client.clone())),
        stage_deploys: Arc::new(KubeStore::new(client.clone())),
        jenkins_folders: Arc::new(KubeStore::new(client.clone())),
        config_maps: Arc::new(KubeStore::new(client.clone())),
        config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(constants::DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval = Duration::from_millis(constants::DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}
