//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager used for server-side status patches
pub const FIELD_MANAGER: &str = "codebase-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default base delay for failure backoff (seconds)
/// `Backoff(0)` equals this value
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 10;

/// Default cap on the failure backoff (seconds), six hours
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 6 * 60 * 60;

/// Default delay used when a handler postpones without naming its own delay (seconds)
pub const DEFAULT_POSTPONE_SECS: u64 = 30;

/// Default number of retries when removing a finalizer races with another writer
pub const DEFAULT_FINALIZER_CONFLICT_RETRIES: u32 = 5;

/// Default maximum number of concurrent reconciliations per entity kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default root for local checkouts
pub const DEFAULT_WORKING_DIR: &str = "/home/codebase-operator";

/// Default location of deployment templates and CI file templates
pub const DEFAULT_ASSETS_DIR: &str = "/usr/local/bin";

/// Default branch used when a codebase does not name one
pub const DEFAULT_BRANCH: &str = "master";

/// Default git user for SSH access to git servers
pub const DEFAULT_GIT_USER: &str = "git";

/// Default SSH port of git servers
pub const DEFAULT_SSH_PORT: i32 = 22;

/// Default HTTPS port of git servers
pub const DEFAULT_HTTP_PORT: i32 = 443;

/// Secret key holding the SSH private key of a git server
pub const SECRET_KEY_SSH_PRIVATE_KEY: &str = "id_rsa";

/// Secret key holding the API token of a git server
pub const SECRET_KEY_TOKEN: &str = "token";

/// Secret key holding the shared webhook secret of a git server
pub const SECRET_KEY_WEBHOOK_SECRET: &str = "secretString";

/// Directory inside a checkout where deployment templates are written
pub const DEPLOY_TEMPLATES_DIR: &str = "deploy-templates";

/// File written by the version-file step
pub const VERSION_FILE: &str = "VERSION";

/// GitLab CI definition file
pub const GITLAB_CI_FILE: &str = ".gitlab-ci.yml";

/// Default version written into the version file
pub const DEFAULT_START_VERSION: &str = "0.0.1";

/// Label put on CI trigger registrations created for stage deploys
pub const LABEL_STAGE_DEPLOY: &str = "app.edp.epam.com/cdstagedeploy";

/// How long startup waits for the metrics server to bind (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the metrics server (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Directory under the working directory where temporary SSH keys are written
pub const SSH_KEY_DIR: &str = ".ssh-keys";
