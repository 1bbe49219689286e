//! In-memory store with API-server-like semantics
//!
//! - `create` assigns a uid and a resource version
//! - `replace` rejects stale resource versions with `Conflict`
//! - `delete` of an object with finalizers only sets its deletion timestamp;
//!   the object disappears once its last finalizer is removed
//!
//! Used by the test suites in place of a cluster.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;

use super::{EntityStore, NamespacedObject, ResourceStore, StoreError, status_of};

type Key = (String, String);

#[derive(Debug)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<Key, K>>,
    next_version: AtomicUsize,
    pending_conflicts: AtomicU32,
    pending_status_failures: AtomicU32,
    creates: AtomicUsize,
    replaces: AtomicUsize,
    deletes: AtomicUsize,
    status_patches: AtomicUsize,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            next_version: AtomicUsize::new(1),
            pending_conflicts: AtomicU32::new(0),
            pending_status_failures: AtomicU32::new(0),
            creates: AtomicUsize::new(0),
            replaces: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            status_patches: AtomicUsize::new(0),
        }
    }
}

fn key_of<K: NamespacedObject>(object: &K) -> Key {
    (object.namespace().unwrap_or_default(), object.name_any())
}

impl<K: NamespacedObject> MemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Key, K>>, StoreError> {
        self.objects
            .lock()
            .map_err(|e| anyhow::anyhow!("memory store lock poisoned: {e}").into())
    }

    fn bump_version(&self, object: &mut K) {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        object.meta_mut().resource_version = Some(version.to_string());
    }

    /// Seed an object without counting it as a create
    pub fn insert(&self, mut object: K) -> K {
        if object.meta().uid.is_none() {
            object.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
        }
        self.bump_version(&mut object);
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(key_of(&object), object.clone());
        }
        object
    }

    /// Current copy of an object
    pub fn snapshot(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(&(namespace.to_string(), name.to_string())).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `count` replace calls fail with `Conflict`
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` status patches fail as if the API server were unreachable
    pub fn fail_status_patches(&self, count: u32) {
        self.pending_status_failures.store(count, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn status_patches(&self) -> usize {
        self.status_patches.load(Ordering::SeqCst)
    }

    fn conflict(object_name: String) -> StoreError {
        StoreError::Conflict {
            kind: K::kind(&()).to_string(),
            name: object_name,
        }
    }
}

/// Deletion timestamp as the API server would stamp it
fn deletion_time() -> anyhow::Result<Time> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    Ok(serde_json::from_value(serde_json::Value::String(now))?)
}

#[async_trait]
impl<K: NamespacedObject> ResourceStore<K> for MemoryStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        let objects = self.lock()?;
        Ok(objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let mut created = object.clone();
        created.meta_mut().namespace = Some(namespace.to_string());
        let key = key_of(&created);

        let mut objects = self.lock()?;
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: K::kind(&()).to_string(),
                name: key.1,
            });
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        created.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
        self.bump_version(&mut created);
        objects.insert(key, created.clone());
        Ok(created)
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        let key = key_of(object);
        self.replaces.fetch_add(1, Ordering::SeqCst);

        if self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Self::conflict(key.1));
        }

        let mut objects = self.lock()?;
        let Some(stored) = objects.get(&key) else {
            return Err(anyhow::anyhow!("{} {} not found", K::kind(&()), key.1).into());
        };
        if stored.meta().resource_version != object.meta().resource_version {
            return Err(Self::conflict(key.1));
        }

        let mut replaced = object.clone();
        // Deletion timestamp is owned by the server
        replaced.meta_mut().deletion_timestamp = stored.meta().deletion_timestamp.clone();
        self.bump_version(&mut replaced);

        if replaced.meta().deletion_timestamp.is_some() && replaced.finalizers().is_empty() {
            objects.remove(&key);
        } else {
            objects.insert(key, replaced.clone());
        }
        Ok(replaced)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let key = (namespace.to_string(), name.to_string());
        let mut objects = self.lock()?;
        let Some(object) = objects.get_mut(&key) else {
            return Ok(());
        };
        self.deletes.fetch_add(1, Ordering::SeqCst);

        if object.finalizers().is_empty() {
            objects.remove(&key);
            return Ok(());
        }
        if object.meta().deletion_timestamp.is_none() {
            object.meta_mut().deletion_timestamp = Some(deletion_time()?);
            let version = self.next_version.fetch_add(1, Ordering::SeqCst);
            object.meta_mut().resource_version = Some(version.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl<K: NamespacedObject> EntityStore<K> for MemoryStore<K> {
    async fn patch_status(&self, object: &K) -> Result<(), StoreError> {
        let key = key_of(object);
        if self
            .pending_status_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow::anyhow!("status patch of {} {} rejected", K::kind(&()), key.1).into());
        }
        let status = status_of(object)?;

        let mut objects = self.lock()?;
        let Some(stored) = objects.get(&key) else {
            return Err(anyhow::anyhow!("{} {} not found", K::kind(&()), key.1).into());
        };
        self.status_patches.fetch_add(1, Ordering::SeqCst);

        let mut value = serde_json::to_value(stored).map_err(anyhow::Error::from)?;
        value["status"] = status;
        let mut patched: K = serde_json::from_value(value).map_err(anyhow::Error::from)?;
        self.bump_version(&mut patched);
        objects.insert(key, patched);
        Ok(())
    }
}
