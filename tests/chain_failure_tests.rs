//! # Chain Failure Tests
//!
//! A failing handler in the middle of a chain, seen through the reconciler
//! and the error policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use codebase_operator::controller::backoff::BackoffPolicy;
use codebase_operator::controller::chain::{Chain, Handler, RequestContext};
use codebase_operator::controller::reconciler::{Reconciler, StaticProvisioner};
use codebase_operator::crd::{ActionResult, CDStageDeploy, CDStageDeploySpec, CodebaseTag, value};
use codebase_operator::runtime::handle_reconciliation_error;
use codebase_operator::store::MemoryStore;
use kube_runtime::controller::Action;

struct Step {
    name: &'static str,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler<CDStageDeploy> for Step {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn serve_request(&self, _ctx: &RequestContext, _deploy: &mut CDStageDeploy) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("registry timed out");
        }
        Ok(())
    }
}

fn step(name: &'static str, fail: bool) -> (Step, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (
        Step {
            name,
            fail,
            calls: Arc::clone(&calls),
        },
        calls,
    )
}

fn deploy() -> CDStageDeploy {
    let mut deploy = CDStageDeploy::new(
        "mypipeline-dev",
        CDStageDeploySpec {
            pipeline: "mypipeline".to_string(),
            stage: "dev".to_string(),
            tag: Some(CodebaseTag {
                codebase: "payments".to_string(),
                tag: "0.1.0".to_string(),
            }),
        },
    );
    deploy.metadata.namespace = Some("platform".to_string());
    deploy
}

#[tokio::test]
async fn test_second_of_three_handlers_fails() {
    let (first, first_calls) = step("first", false);
    let (second, second_calls) = step("second", true);
    let (third, third_calls) = step("third", false);
    let chain = Chain::new().with(first).with(second).with(third);

    let store = Arc::new(MemoryStore::<CDStageDeploy>::new());
    store.insert(deploy());
    let backoff = BackoffPolicy::new(Duration::from_secs(10));
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        Arc::new(StaticProvisioner::new(chain)),
        backoff,
    ));

    let err = reconciler.reconcile("platform", "mypipeline-dev").await.unwrap_err();

    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    assert_eq!(err.requeue_after(), Some(backoff.delay(1)));

    let stored = store.snapshot("platform", "mypipeline-dev").unwrap();
    let status = stored.status.clone().unwrap();
    assert_eq!(status.value, value::FAILED);
    assert_eq!(status.failure_count, 1);
    assert_eq!(status.action, "second");
    assert_eq!(status.result, Some(ActionResult::Error));
    assert_eq!(status.detailed_message.as_deref(), Some("registry timed out"));

    // The controller requeues with the delay the reconciler chose
    let action = handle_reconciliation_error(Arc::new(stored), &err, Arc::clone(&reconciler));
    assert_eq!(action, Action::requeue(Duration::from_secs(20)));
}

#[tokio::test]
async fn test_delay_grows_with_consecutive_failures() {
    let (failing, _) = step("failing", true);
    let store = Arc::new(MemoryStore::<CDStageDeploy>::new());
    store.insert(deploy());
    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(StaticProvisioner::new(Chain::new().with(failing))),
        BackoffPolicy::new(Duration::from_secs(10)),
    );

    let mut delays = Vec::new();
    for _ in 0..5 {
        let err = reconciler.reconcile("platform", "mypipeline-dev").await.unwrap_err();
        delays.push(err.requeue_after().unwrap().as_secs());
    }

    assert_eq!(delays, vec![20, 30, 50, 80, 130]);
    let status = store.snapshot("platform", "mypipeline-dev").unwrap().status.unwrap();
    assert_eq!(status.failure_count, 5);
}
