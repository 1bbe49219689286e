//! # Error Policy
//!
//! Requeue decision for reconciliations that surfaced an error.
//!
//! The reconciler already computed the backoff from the entity's failure
//! count; store errors carry no delay and retry after the base delay.

use std::sync::Arc;

use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::warn;

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::TrackedEntity;
use crate::observability::metrics;

pub fn handle_reconciliation_error<K: TrackedEntity>(
    object: Arc<K>,
    error: &ReconcilerError,
    reconciler: Arc<Reconciler<K>>,
) -> Action {
    let kind = K::kind(&());
    let namespace = object.namespace().unwrap_or_default();
    let delay = error
        .requeue_after()
        .unwrap_or_else(|| reconciler.backoff().base());

    warn!(
        resource.kind = %kind,
        resource.name = %object.name_any(),
        resource.namespace = %namespace,
        delay_secs = delay.as_secs(),
        error = %error,
        "Reconciliation error, requeueing"
    );
    metrics::increment_requeues(&kind, error.as_str());
    Action::requeue(delay)
}
