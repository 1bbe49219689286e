//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::controller::backoff::BackoffPolicy;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Root directory for local checkouts
    pub working_dir: PathBuf,
    /// Directory holding `templates/` and `gitlab-ci/` assets
    pub assets_dir: PathBuf,
    /// PostgreSQL connection string for the external progress store
    /// When unset, progress markers live in the entity status
    pub database_url: Option<String>,
    /// Scope under which progress markers are stored
    /// Defaults to the entity namespace
    pub progress_scope: Option<String>,
    /// Base delay of the failure backoff (seconds)
    pub backoff_base_secs: u64,
    /// Cap on the failure backoff (seconds)
    pub backoff_max_secs: u64,
    /// Delay used by handlers that postpone without naming a delay (seconds)
    pub postpone_secs: u64,
    /// Bounded retries for finalizer removal on optimistic-concurrency conflicts
    pub finalizer_conflict_retries: u32,
    /// Maximum concurrent reconciliations per entity kind
    pub max_concurrent_reconciliations: u16,
    /// Whether the validating admission webhook is deployed alongside the operator
    pub enable_webhook: bool,
    /// Fallback URL registered as repository webhook when a git server names none
    pub webhook_base_url: Option<String>,
    /// Jenkins base URL; cleanup jobs are skipped when unset
    pub jenkins_url: Option<String>,
    /// Jenkins user for API calls
    pub jenkins_user: Option<String>,
    /// Jenkins API token
    pub jenkins_token: Option<String>,
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            database_url: None,
            progress_scope: None,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            postpone_secs: DEFAULT_POSTPONE_SECS,
            finalizer_conflict_retries: DEFAULT_FINALIZER_CONFLICT_RETRIES,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            enable_webhook: false,
            webhook_base_url: None,
            jenkins_url: None,
            jenkins_user: None,
            jenkins_token: None,
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            working_dir: PathBuf::from(env_var_or_default_str("WORKING_DIR", DEFAULT_WORKING_DIR)),
            assets_dir: PathBuf::from(env_var_or_default_str("ASSETS_DIR", DEFAULT_ASSETS_DIR)),
            database_url: env_var_opt("DATABASE_URL"),
            progress_scope: env_var_opt("PROGRESS_SCOPE"),
            backoff_base_secs: env_var_or_default("BACKOFF_BASE_SECS", DEFAULT_BACKOFF_BASE_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            postpone_secs: env_var_or_default("POSTPONE_SECS", DEFAULT_POSTPONE_SECS),
            finalizer_conflict_retries: env_var_or_default(
                "FINALIZER_CONFLICT_RETRIES",
                DEFAULT_FINALIZER_CONFLICT_RETRIES,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            enable_webhook: env_var_or_default_bool("ENABLE_WEBHOOK", false),
            webhook_base_url: env_var_opt("WEBHOOK_BASE_URL"),
            jenkins_url: env_var_opt("JENKINS_URL"),
            jenkins_user: env_var_opt("JENKINS_USER"),
            jenkins_token: env_var_opt("JENKINS_TOKEN"),
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }

    /// Backoff policy built from the configured base and cap
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(self.backoff_base_secs))
            .with_max(Duration::from_secs(self.backoff_max_secs))
    }

    /// Get postpone duration
    pub fn postpone_duration(&self) -> Duration {
        Duration::from_secs(self.postpone_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a non-empty environment variable
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
