//! # Codebase Operator
//!
//! Watches `Codebase`, `CodebaseBranch`, `CodebaseImageStream` and
//! `CDStageDeploy` resources and provisions what they describe.
//!
//! Configuration comes from environment variables, see
//! [`codebase_operator::config::ControllerConfig`].

use anyhow::Result;
use codebase_operator::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;
    run_watch_loop(init_result).await
}
