//! # Stage Deploy Tests
//!
//! Image stream labels request stage deploys; stage deploys register a CI
//! trigger. Both are get-or-create and report an unconsumed earlier request
//! as not yet processed, which image streams wait out and stage deploys
//! count as a failure.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{Harness, NAMESPACE};
use codebase_operator::crd::{
    CDStageDeploy, CDStageDeploySpec, CodebaseImageStream, CodebaseImageStreamSpec, CodebaseTag,
    EntityStatus, ImageTag, value,
};
use codebase_operator::controller::reconciler::ReconcilerError;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use kube::api::ObjectMeta;
use kube_runtime::controller::Action;

fn image_stream() -> CodebaseImageStream {
    let mut stream = CodebaseImageStream::new(
        "payments-master",
        CodebaseImageStreamSpec {
            codebase: "payments".to_string(),
            image_name: "registry.example.com/platform/payments".to_string(),
            tags: vec![
                ImageTag {
                    name: "0.1.0-SNAPSHOT.1".to_string(),
                    created: "2026-03-01T10:00:00Z".to_string(),
                },
                ImageTag {
                    name: "0.1.0-SNAPSHOT.2".to_string(),
                    created: "2026-03-02T10:00:00Z".to_string(),
                },
            ],
        },
    );
    stream.metadata.namespace = Some(NAMESPACE.to_string());
    stream.metadata.labels = Some(BTreeMap::from([
        ("mypipeline/dev".to_string(), String::new()),
        ("app.kubernetes.io/name".to_string(), "payments".to_string()),
    ]));
    stream
}

fn tag(name: &str) -> CodebaseTag {
    CodebaseTag {
        codebase: "payments".to_string(),
        tag: name.to_string(),
    }
}

fn stage_deploy(tag_name: &str, status: Option<&str>) -> CDStageDeploy {
    let mut deploy = CDStageDeploy::new(
        "mypipeline-dev",
        CDStageDeploySpec {
            pipeline: "mypipeline".to_string(),
            stage: "dev".to_string(),
            tag: Some(tag(tag_name)),
        },
    );
    deploy.metadata.namespace = Some(NAMESPACE.to_string());
    deploy.status = status.map(|v| EntityStatus {
        value: v.to_string(),
        ..EntityStatus::default()
    });
    deploy
}

#[tokio::test]
async fn test_label_requests_stage_deploy_of_latest_tag() {
    let h = Harness::new();
    h.image_streams.insert(image_stream());

    let action = h
        .image_stream_reconciler()
        .reconcile(NAMESPACE, "payments-master")
        .await
        .unwrap();

    assert_eq!(action, Action::await_change());
    assert_eq!(h.stage_deploys.len(), 1);
    let deploy = h.stage_deploys.snapshot(NAMESPACE, "mypipeline-dev").unwrap();
    assert_eq!(deploy.spec.pipeline, "mypipeline");
    assert_eq!(deploy.spec.stage, "dev");
    assert_eq!(deploy.spec.tag, Some(tag("0.1.0-SNAPSHOT.2")));

    let stream = h.image_streams.snapshot(NAMESPACE, "payments-master").unwrap();
    assert_eq!(deploy.owner_references()[0].uid, stream.uid().unwrap());
    assert_eq!(stream.status.unwrap().value, value::ACTIVE);
}

#[tokio::test]
async fn test_pending_stage_deploy_is_waited_for() {
    let h = Harness::new();
    h.image_streams.insert(image_stream());
    h.stage_deploys
        .insert(stage_deploy("0.1.0-SNAPSHOT.1", Some(value::IN_PROGRESS)));

    let action = h
        .image_stream_reconciler()
        .reconcile(NAMESPACE, "payments-master")
        .await
        .unwrap();

    // Not a failure: requeued after the base delay
    assert_eq!(action, Action::requeue(Duration::from_secs(10)));
    assert_eq!(h.stage_deploys.creates(), 0);
    assert_eq!(h.stage_deploys.deletes(), 0);
    let existing = h.stage_deploys.snapshot(NAMESPACE, "mypipeline-dev").unwrap();
    assert_eq!(existing.spec.tag, Some(tag("0.1.0-SNAPSHOT.1")));

    let status = h
        .image_streams
        .snapshot(NAMESPACE, "payments-master")
        .unwrap()
        .status
        .unwrap();
    assert_eq!(status.value, value::IN_PROGRESS);
    assert_eq!(status.failure_count, 0);
    assert_eq!(status.action, "put-cd-stage-deploy");
}

#[tokio::test]
async fn test_finished_stage_deploy_is_replaced_on_next_pass() {
    let h = Harness::new();
    h.image_streams.insert(image_stream());
    h.stage_deploys
        .insert(stage_deploy("0.1.0-SNAPSHOT.1", Some(value::FINISHED)));
    let reconciler = h.image_stream_reconciler();

    let action = reconciler.reconcile(NAMESPACE, "payments-master").await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(10)));
    assert!(h.stage_deploys.snapshot(NAMESPACE, "mypipeline-dev").is_none());

    let action = reconciler.reconcile(NAMESPACE, "payments-master").await.unwrap();
    assert_eq!(action, Action::await_change());
    let deploy = h.stage_deploys.snapshot(NAMESPACE, "mypipeline-dev").unwrap();
    assert_eq!(deploy.spec.tag, Some(tag("0.1.0-SNAPSHOT.2")));
    assert_eq!(h.stage_deploys.creates(), 1);
}

#[tokio::test]
async fn test_stage_deploy_for_current_tag_is_not_duplicated() {
    let h = Harness::new();
    h.image_streams.insert(image_stream());
    h.stage_deploys.insert(stage_deploy("0.1.0-SNAPSHOT.2", None));

    let action = h
        .image_stream_reconciler()
        .reconcile(NAMESPACE, "payments-master")
        .await
        .unwrap();

    assert_eq!(action, Action::await_change());
    assert_eq!(h.stage_deploys.creates(), 0);
    assert_eq!(h.stage_deploys.len(), 1);
}

#[tokio::test]
async fn test_stage_deploy_registers_ci_trigger() {
    let h = Harness::new();
    h.stage_deploys.insert(stage_deploy("0.1.0-SNAPSHOT.2", None));
    let reconciler = h.stage_deploy_reconciler();

    let action = reconciler.reconcile(NAMESPACE, "mypipeline-dev").await.unwrap();
    assert_eq!(action, Action::await_change());

    let trigger = h.config_maps.snapshot(NAMESPACE, "deploy-mypipeline-dev").unwrap();
    let data = trigger.data.clone().unwrap();
    assert_eq!(data["pipeline"], "mypipeline");
    assert_eq!(data["stage"], "dev");
    assert_eq!(data["codebase"], "payments");
    assert_eq!(data["tag"], "0.1.0-SNAPSHOT.2");

    let deploy = h.stage_deploys.snapshot(NAMESPACE, "mypipeline-dev").unwrap();
    assert_eq!(trigger.owner_references()[0].uid, deploy.uid().unwrap());
    assert_eq!(deploy.status.unwrap().value, value::FINISHED);

    reconciler.reconcile(NAMESPACE, "mypipeline-dev").await.unwrap();
    assert_eq!(h.config_maps.creates(), 1);
    assert_eq!(h.config_maps.replaces(), 0);
}

#[tokio::test]
async fn test_foreign_trigger_counts_as_failure() {
    let h = Harness::new();
    h.stage_deploys.insert(stage_deploy("0.1.0-SNAPSHOT.2", None));
    h.config_maps.insert(ConfigMap {
        metadata: ObjectMeta {
            name: Some("deploy-mypipeline-dev".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..ObjectMeta::default()
        },
        ..ConfigMap::default()
    });

    let err = h
        .stage_deploy_reconciler()
        .reconcile(NAMESPACE, "mypipeline-dev")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcilerError::Failed { .. }));
    assert_eq!(err.requeue_after(), Some(Duration::from_secs(20)));
    let status = h
        .stage_deploys
        .snapshot(NAMESPACE, "mypipeline-dev")
        .unwrap()
        .status
        .unwrap();
    assert_eq!(status.value, value::FAILED);
    assert_eq!(status.failure_count, 1);
    assert_eq!(h.config_maps.creates(), 0);
}

#[tokio::test]
async fn test_stage_deploy_without_tag_is_skipped() {
    let h = Harness::new();
    let mut deploy = stage_deploy("unused", None);
    deploy.spec.tag = None;
    h.stage_deploys.insert(deploy);

    let action = h
        .stage_deploy_reconciler()
        .reconcile(NAMESPACE, "mypipeline-dev")
        .await
        .unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.config_maps.is_empty());
    assert!(h
        .stage_deploys
        .snapshot(NAMESPACE, "mypipeline-dev")
        .unwrap()
        .status
        .is_none());
}
