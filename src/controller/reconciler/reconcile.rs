//! # Reconciliation Loop
//!
//! Level-triggered reconciliation shared by every entity kind.
//!
//! 1. Fetch the entity; a missing entity is done.
//! 2. Entities marked for deletion run the deletion chain and lose their
//!    finalizer once it completes.
//! 3. Otherwise the finalizer is ensured, the spec is checked, and the chain
//!    picked by the provisioner runs.
//! 4. The chain outcome is classified once, here, into a status transition
//!    and a requeue decision.
//! 5. A changed status is persisted exactly once on the way out.

use std::sync::Arc;
use std::time::Instant;

use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use super::finalizer::{ensure_finalizer, has_finalizer, remove_finalizer};
use super::provisioner::Provisioner;
use super::status::{mark_failed, mark_in_progress, mark_postponed, mark_succeeded, touch};
use super::types::{NotYetProcessedPolicy, ReconcilerError};
use crate::constants::DEFAULT_FINALIZER_CONFLICT_RETRIES;
use crate::controller::backoff::BackoffPolicy;
use crate::controller::chain::RequestContext;
use crate::controller::errors::{ErrorClass, classify};
use crate::crd::TrackedEntity;
use crate::observability::metrics;
use crate::store::{SharedEntityStore, status_of};

/// Result of one pass plus whether the status still has to be written
struct Outcome {
    result: Result<Action, ReconcilerError>,
    persist: bool,
}

impl Outcome {
    fn persisted(result: Result<Action, ReconcilerError>) -> Self {
        Self {
            result,
            persist: true,
        }
    }

    fn released() -> Self {
        Self {
            result: Ok(Action::await_change()),
            persist: false,
        }
    }
}

/// Status as JSON without the transition timestamp
fn status_fingerprint<K: TrackedEntity>(entity: &K) -> serde_json::Value {
    let mut status = status_of(entity).unwrap_or(serde_json::Value::Null);
    if let Some(fields) = status.as_object_mut() {
        fields.remove("lastTimeUpdated");
    }
    status
}

/// Reconciler for one entity kind
pub struct Reconciler<K: TrackedEntity> {
    store: SharedEntityStore<K>,
    provisioner: Arc<dyn Provisioner<K>>,
    backoff: BackoffPolicy,
    finalizer_retries: u32,
    cancel: CancellationToken,
}

impl<K: TrackedEntity> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &K::kind(&()))
            .field("backoff", &self.backoff)
            .field("finalizer_retries", &self.finalizer_retries)
            .finish_non_exhaustive()
    }
}

impl<K: TrackedEntity> Reconciler<K> {
    pub fn new(
        store: SharedEntityStore<K>,
        provisioner: Arc<dyn Provisioner<K>>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            store,
            provisioner,
            backoff,
            finalizer_retries: DEFAULT_FINALIZER_CONFLICT_RETRIES,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_finalizer_retries(mut self, retries: u32) -> Self {
        self.finalizer_retries = retries;
        self
    }

    /// Share the caller's cancellation; each reconciliation gets a child token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Reconcile the entity `namespace/name`
    ///
    /// # Errors
    ///
    /// Chain failures and store errors; the error carries the requeue delay
    /// when the reconciler chose one.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action, ReconcilerError> {
        let kind = K::kind(&());
        let start = Instant::now();
        metrics::increment_reconciliations(&kind);

        let span = info_span!(
            "reconcile",
            resource.kind = %kind,
            resource.name = name,
            resource.namespace = namespace
        );
        let result = self
            .reconcile_entity(namespace, name, span.clone())
            .instrument(span)
            .await;

        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::increment_reconciliation_errors(&kind);
        }
        result
    }

    async fn reconcile_entity(
        &self,
        namespace: &str,
        name: &str,
        span: Span,
    ) -> Result<Action, ReconcilerError> {
        let Some(mut entity) = self.store.get(namespace, name).await? else {
            debug!("Entity no longer exists");
            return Ok(Action::await_change());
        };
        let before = status_fingerprint(&entity);
        let ctx = RequestContext::new(span, self.cancel.child_token());

        let outcome = if entity.meta().deletion_timestamp.is_some() {
            self.finalize(&ctx, &mut entity).await
        } else {
            self.provision(&ctx, &mut entity).await
        };

        if outcome.persist && status_fingerprint(&entity) != before {
            touch(&mut entity);
            if let Err(e) = self.store.patch_status(&entity).await {
                warn!(error = %e, "Failed to persist status");
            }
        }
        outcome.result
    }

    async fn provision(&self, ctx: &RequestContext, entity: &mut K) -> Outcome {
        match ensure_finalizer(self.store.as_ref(), entity).await {
            Ok(Some(stored)) => *entity = stored,
            Ok(None) => {}
            Err(e) => return Outcome::persisted(Err(e.into())),
        }

        if let Err(reason) = self.provisioner.validate(entity) {
            info!(%reason, "Skipping entity with invalid spec");
            return Outcome::persisted(Ok(Action::await_change()));
        }

        mark_in_progress(entity);
        let chain = self.provisioner.chain(entity);
        let result = chain.serve_request(ctx, entity).await;
        let action = ctx.last_action().unwrap_or_default();
        let kind = K::kind(&());

        let Err(error) = result else {
            mark_succeeded(entity, action);
            info!(action, "Reconciliation succeeded");
            return Outcome::persisted(Ok(Action::await_change()));
        };

        let class = classify(&error);
        let result = match class {
            ErrorClass::Postpone(delay) => {
                mark_postponed(entity, action);
                metrics::increment_postpones(&kind);
                metrics::increment_requeues(&kind, class.as_str());
                info!(action, delay_secs = delay.as_secs(), reason = %error, "Reconciliation postponed");
                Ok(Action::requeue(delay))
            }
            ErrorClass::NotYetProcessed
                if self.provisioner.not_yet_processed() == NotYetProcessedPolicy::Postpone =>
            {
                mark_postponed(entity, action);
                let delay = self.backoff.delay(entity.failure_count());
                metrics::increment_requeues(&kind, class.as_str());
                info!(action, delay_secs = delay.as_secs(), reason = %error, "Waiting for downstream object");
                Ok(Action::requeue(delay))
            }
            _ => {
                let failures = mark_failed(entity, action, &error);
                let delay = self.backoff.delay(failures);
                warn!(action, failures, delay_secs = delay.as_secs(), error = %format!("{error:#}"), "Reconciliation failed");
                Err(ReconcilerError::Failed {
                    error,
                    requeue_after: delay,
                })
            }
        };
        Outcome::persisted(result)
    }

    async fn finalize(&self, ctx: &RequestContext, entity: &mut K) -> Outcome {
        if !has_finalizer(entity) {
            debug!("Deleted entity carries no finalizer of ours");
            return Outcome {
                result: Ok(Action::await_change()),
                persist: false,
            };
        }

        let chain = self.provisioner.deletion_chain();
        let result = chain.serve_request(ctx, entity).await;
        let action = ctx.last_action().unwrap_or_default();
        let kind = K::kind(&());

        let Err(error) = result else {
            return match remove_finalizer(self.store.as_ref(), entity, self.finalizer_retries).await {
                Ok(()) => {
                    info!("Deletion completed, finalizer removed");
                    Outcome::released()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to remove finalizer");
                    Outcome::persisted(Err(e.into()))
                }
            };
        };

        let class = classify(&error);
        let result = match class {
            ErrorClass::Postpone(delay) => {
                mark_postponed(entity, action);
                metrics::increment_postpones(&kind);
                metrics::increment_requeues(&kind, class.as_str());
                Ok(Action::requeue(delay))
            }
            ErrorClass::JobFailed => {
                let failures = mark_failed(entity, action, &error);
                let delay = self.backoff.delay(failures);
                metrics::increment_requeues(&kind, class.as_str());
                info!(action, failures, delay_secs = delay.as_secs(), reason = %error, "Cleanup job not completed, keeping finalizer");
                Ok(Action::requeue(delay))
            }
            _ => {
                let failures = mark_failed(entity, action, &error);
                let delay = self.backoff.delay(failures);
                warn!(action, failures, error = %format!("{error:#}"), "Deletion failed, keeping finalizer");
                Err(ReconcilerError::DeletionFailed {
                    error,
                    requeue_after: delay,
                })
            }
        };
        Outcome::persisted(result)
    }
}
