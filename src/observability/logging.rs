//! # Logging
//!
//! `tracing` subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured log level applies to
//! this crate only.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `format` is `json` or `text`; anything else falls back to text.
pub fn init_tracing(log_level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(log_level).into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if format.eq_ignore_ascii_case("json") {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }
    Ok(())
}

fn default_directive(log_level: &str) -> String {
    format!("codebase_operator={}", log_level.to_lowercase())
}
