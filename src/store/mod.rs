//! # Object Stores
//!
//! Read/write access to namespaced cluster objects.
//!
//! - [`ResourceStore`] is the get-or-create surface handlers use for
//!   downstream objects (branches, image streams, secrets, config maps).
//! - [`EntityStore`] adds the status patch the reconciler needs for tracked
//!   entities.
//!
//! [`KubeStore`] talks to the API server, [`MemoryStore`] keeps objects in a
//! map and emulates optimistic concurrency and finalizer-driven garbage
//! collection.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use kube::Resource;
use kube::core::NamespaceResourceScope;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Any namespaced object the stores can hold
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read
    #[error("{kind} {name} was modified concurrently")]
    Conflict { kind: String, name: String },
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Namespaced object access
#[async_trait]
pub trait ResourceStore<K: NamespacedObject>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// Create `object` in `namespace`; an existing object is `AlreadyExists`
    async fn create(&self, namespace: &str, object: &K) -> Result<K, StoreError>;

    /// Replace the whole object, failing with `Conflict` when its
    /// `resourceVersion` is stale
    async fn replace(&self, object: &K) -> Result<K, StoreError>;

    /// Delete by name; deleting a missing object succeeds
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// Tracked entity access
#[async_trait]
pub trait EntityStore<K: NamespacedObject>: ResourceStore<K> {
    /// Write `object.status` without touching spec or metadata
    async fn patch_status(&self, object: &K) -> Result<(), StoreError>;
}

pub type SharedResourceStore<K> = Arc<dyn ResourceStore<K>>;
pub type SharedEntityStore<K> = Arc<dyn EntityStore<K>>;

/// Extract `status` from a serialized object, `null` when absent
pub(crate) fn status_of<K: Serialize>(object: &K) -> anyhow::Result<serde_json::Value> {
    let mut value = serde_json::to_value(object)?;
    Ok(value
        .get_mut("status")
        .map(serde_json::Value::take)
        .unwrap_or(serde_json::Value::Null))
}
