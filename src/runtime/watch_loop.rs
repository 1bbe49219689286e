//! # Watch Loop
//!
//! One `kube` controller per entity kind, all sharing the collaborators and
//! a cancellation token. On shutdown the token is cancelled so in-flight
//! chains stop between handlers and postpone.
//!
//! Each controller also watches the children its chain creates:
//!
//! | entity                | owned children         |
//! |-----------------------|------------------------|
//! | `Codebase`            | `JenkinsFolder`        |
//! | `CodebaseBranch`      | `CodebaseImageStream`  |
//! | `CodebaseImageStream` | `CDStageDeploy`        |
//! | `CDStageDeploy`       | trigger `ConfigMap`    |

use std::fmt::Debug;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use kube_runtime::controller::{self, Action};
use kube_runtime::{Controller, watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error_policy::handle_reconciliation_error;
use super::initialization::InitializationResult;
use crate::config::ControllerConfig;
use crate::controller::reconciler::{
    BranchProvisioner, CodebaseProvisioner, ImageStreamProvisioner, Provisioner, Reconciler,
    ReconcilerError, StageDeployProvisioner,
};
use crate::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, JenkinsFolder, TrackedEntity,
};
use crate::store::{KubeStore, SharedEntityStore};

async fn reconcile_object<K: TrackedEntity>(
    object: Arc<K>,
    reconciler: Arc<Reconciler<K>>,
) -> Result<Action, ReconcilerError> {
    let namespace = object.namespace().unwrap_or_default();
    reconciler.reconcile(&namespace, &object.name_any()).await
}

/// Api over the namespace the operator watches, or all of them
fn scoped_api<T>(client: &Client, config: &ControllerConfig) -> Api<T>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
{
    match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Adds the owned-object watches of one entity kind
pub type OwnedWatches<K> = fn(Controller<K>, &Client, &ControllerConfig) -> Controller<K>;

fn watcher_config() -> watcher::Config {
    watcher::Config::default().any_semantic()
}

fn codebase_children(
    controller: Controller<Codebase>,
    client: &Client,
    config: &ControllerConfig,
) -> Controller<Codebase> {
    controller.owns(scoped_api::<JenkinsFolder>(client, config), watcher_config())
}

fn branch_children(
    controller: Controller<CodebaseBranch>,
    client: &Client,
    config: &ControllerConfig,
) -> Controller<CodebaseBranch> {
    controller.owns(scoped_api::<CodebaseImageStream>(client, config), watcher_config())
}

fn image_stream_children(
    controller: Controller<CodebaseImageStream>,
    client: &Client,
    config: &ControllerConfig,
) -> Controller<CodebaseImageStream> {
    controller.owns(scoped_api::<CDStageDeploy>(client, config), watcher_config())
}

fn stage_deploy_children(
    controller: Controller<CDStageDeploy>,
    client: &Client,
    config: &ControllerConfig,
) -> Controller<CDStageDeploy> {
    controller.owns(scoped_api::<ConfigMap>(client, config), watcher_config())
}

/// Run the controller for one entity kind until shutdown
pub async fn run_controller<K: TrackedEntity>(
    client: Client,
    config: &ControllerConfig,
    provisioner: Arc<dyn Provisioner<K>>,
    owns: OwnedWatches<K>,
    cancel: CancellationToken,
) {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = scoped_api(&client, config);
    let controller = owns(Controller::new(api, watcher_config()), &client, config);
    let store: SharedEntityStore<K> = Arc::new(KubeStore::new(client));
    let reconciler = Arc::new(
        Reconciler::new(store, provisioner, config.backoff_policy())
            .with_finalizer_retries(config.finalizer_conflict_retries)
            .with_cancellation(cancel.clone()),
    );

    info!(kind = %kind, "Starting controller");
    controller
        .with_config(
            controller::Config::default().concurrency(config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .graceful_shutdown_on(async move { cancel.cancelled().await })
        .run(
            reconcile_object::<K>,
            handle_reconciliation_error::<K>,
            reconciler,
        )
        .for_each(|result| {
            match result {
                Ok((object, action)) => {
                    debug!(resource = %object, ?action, "Reconciled");
                }
                Err(controller::Error::ReconcilerFailed(_, object)) => {
                    debug!(resource = %object, "Reconciliation failed, requeued by error policy");
                }
                Err(e) => warn!(error = %e, "Controller stream error"),
            }
            std::future::ready(())
        })
        .await;
    info!(kind = %kind, "Controller stopped");
}

/// Run all four controllers until a shutdown signal arrives
pub async fn run_watch_loop(init: InitializationResult) -> anyhow::Result<()> {
    let InitializationResult {
        client,
        config,
        collaborators,
        server_state: _,
    } = init;
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, cancelling in-flight reconciliations");
                cancel.cancel();
            }
        });
    }

    futures::join!(
        run_controller::<Codebase>(
            client.clone(),
            &config,
            Arc::new(CodebaseProvisioner::new(&collaborators)),
            codebase_children,
            cancel.clone(),
        ),
        run_controller::<CodebaseBranch>(
            client.clone(),
            &config,
            Arc::new(BranchProvisioner::new(&collaborators)),
            branch_children,
            cancel.clone(),
        ),
        run_controller::<CodebaseImageStream>(
            client.clone(),
            &config,
            Arc::new(ImageStreamProvisioner::new(&collaborators)),
            image_stream_children,
            cancel.clone(),
        ),
        run_controller::<CDStageDeploy>(
            client.clone(),
            &config,
            Arc::new(StageDeployProvisioner::new(&collaborators)),
            stage_deploy_children,
            cancel.clone(),
        ),
    );

    cancel.cancel();
    info!("All controllers stopped");
    Ok(())
}
