//! API-server backed store.

use std::marker::PhantomData;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};

use super::{EntityStore, NamespacedObject, ResourceStore, StoreError, status_of};
use crate::constants::FIELD_MANAGER;

pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<K: NamespacedObject> KubeStore<K> {
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of<K: NamespacedObject>(object: &K) -> Result<String, StoreError> {
    object
        .namespace()
        .ok_or_else(|| anyhow::anyhow!("{} {} has no namespace", K::kind(&()), object.name_any()).into())
}

#[async_trait]
impl<K: NamespacedObject> ResourceStore<K> for KubeStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        match self
            .api(namespace)
            .create(&PostParams::default(), object)
            .await
        {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                Err(StoreError::AlreadyExists {
                    kind: K::kind(&()).to_string(),
                    name: object.name_any(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        let namespace = namespace_of(object)?;
        let name = object.name_any();
        match self
            .api(&namespace)
            .replace(&name, &PostParams::default(), object)
            .await
        {
            Ok(replaced) => Ok(replaced),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Err(StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<K: NamespacedObject> EntityStore<K> for KubeStore<K> {
    async fn patch_status(&self, object: &K) -> Result<(), StoreError> {
        let namespace = namespace_of(object)?;
        let patch = serde_json::json!({
            "status": status_of(object)?
        });
        self.api(&namespace)
            .patch_status(
                &object.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await?;
        Ok(())
    }
}
