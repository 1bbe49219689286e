//! # Runtime Tests
//!
//! Wiring handed from initialization to the watch loops.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use codebase_operator::runtime::InitializationResult;
use codebase_operator::server::ServerState;
use common::Harness;

#[tokio::test]
async fn test_initialization_result_debug_skips_handles() {
    common::init_rustls();
    let h = Harness::new();
    let mut config = kube::Config::new("http://127.0.0.1:6443".parse().unwrap());
    config.default_namespace = "platform".to_string();
    let client = kube::Client::try_from(config).unwrap();

    let init = InitializationResult {
        client,
        config: h.collab.config.clone(),
        collaborators: h.collab.clone(),
        server_state: Arc::new(ServerState {
            is_ready: Arc::new(AtomicBool::new(true)),
        }),
    };

    let rendered = format!("{init:?}");
    assert!(rendered.starts_with("InitializationResult {"));
    assert!(rendered.contains("default_namespace: \"platform\""));
    assert!(rendered.contains("ready: true"));
    assert!(rendered.ends_with(".. }"));
}
