//! # Finalizer Management
//!
//! Adds the per-kind finalizer before any side effect and removes it once the
//! deletion chain has completed. Removal retries a bounded number of times on
//! optimistic-concurrency conflicts, re-reading the entity each time.

use kube::ResourceExt;
use tracing::{debug, warn};

use crate::crd::TrackedEntity;
use crate::store::{EntityStore, StoreError};

/// Make sure the entity carries `K::FINALIZER`
///
/// Returns the stored entity when a write was needed, `None` otherwise.
pub async fn ensure_finalizer<K: TrackedEntity>(
    store: &dyn EntityStore<K>,
    entity: &K,
) -> Result<Option<K>, StoreError> {
    if has_finalizer(entity) {
        return Ok(None);
    }
    let mut updated = entity.clone();
    updated.finalizers_mut().push(K::FINALIZER.to_string());
    let stored = store.replace(&updated).await?;
    debug!(finalizer = K::FINALIZER, "Added finalizer");
    Ok(Some(stored))
}

#[must_use]
pub fn has_finalizer<K: TrackedEntity>(entity: &K) -> bool {
    entity.finalizers().iter().any(|f| f == K::FINALIZER)
}

/// Remove `K::FINALIZER`, retrying conflicts at most `retries` times
///
/// An entity that is already gone or no longer carries the finalizer counts
/// as released.
pub async fn remove_finalizer<K: TrackedEntity>(
    store: &dyn EntityStore<K>,
    entity: &K,
    retries: u32,
) -> Result<(), StoreError> {
    let namespace = entity.namespace().unwrap_or_default();
    let name = entity.name_any();
    let mut current = entity.clone();
    let mut attempt = 0;

    loop {
        if !has_finalizer(&current) {
            return Ok(());
        }
        let mut updated = current.clone();
        updated.finalizers_mut().retain(|f| f != K::FINALIZER);

        match store.replace(&updated).await {
            Ok(_) => {
                debug!(finalizer = K::FINALIZER, "Removed finalizer");
                return Ok(());
            }
            Err(e) if e.is_conflict() && attempt < retries => {
                attempt += 1;
                warn!(attempt, retries, "Conflict removing finalizer, re-reading");
                match store.get(&namespace, &name).await? {
                    Some(fresh) => current = fresh,
                    None => return Ok(()),
                }
            }
            Err(e) => return Err(e),
        }
    }
}
