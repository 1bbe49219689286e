//! # Status Transitions
//!
//! The only place entity status lifecycle fields are written. Handlers never
//! touch `value`, `failureCount`, `detailedMessage`, `action` or `result`.
//!
//! `lastTimeUpdated` is stamped by [`touch`] when the reconciler persists a
//! changed status, so a reconciliation that changes nothing writes nothing.

use crate::crd::{ActionResult, TrackedEntity, value};

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Stamp the time of the last status transition
pub fn touch<K: TrackedEntity>(entity: &mut K) {
    entity.entity_status_mut().last_time_updated = Some(now());
}

/// Reconciliation underway
pub fn mark_in_progress<K: TrackedEntity>(entity: &mut K) {
    entity.entity_status_mut().value = value::IN_PROGRESS.to_string();
}

/// Chain completed: the failure counter starts over
pub fn mark_succeeded<K: TrackedEntity>(entity: &mut K, action: &str) {
    let status = entity.entity_status_mut();
    status.value = K::SUCCESS_VALUE.to_string();
    status.failure_count = 0;
    status.detailed_message = None;
    status.action = action.to_string();
    status.result = Some(ActionResult::Success);
    status.available = true;
}

/// Chain failed at `action`; returns the new failure count
pub fn mark_failed<K: TrackedEntity>(entity: &mut K, action: &str, error: &anyhow::Error) -> i64 {
    let status = entity.entity_status_mut();
    status.value = value::FAILED.to_string();
    status.failure_count = status.failure_count.saturating_add(1);
    status.detailed_message = Some(format!("{error:#}"));
    status.action = action.to_string();
    status.result = Some(ActionResult::Error);
    status.failure_count
}

/// Chain is waiting on something outside this entity; not a failure
pub fn mark_postponed<K: TrackedEntity>(entity: &mut K, action: &str) {
    let status = entity.entity_status_mut();
    status.value = value::IN_PROGRESS.to_string();
    status.detailed_message = None;
    status.action = action.to_string();
    status.result = None;
}
