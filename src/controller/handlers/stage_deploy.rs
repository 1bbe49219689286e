//! # CDStageDeploy Handlers
//!
//! A stage deploy is handed to CI as a `deploy-<name>` ConfigMap carrying the
//! pipeline, stage and tag. The ConfigMap is owned by the stage deploy; one
//! owned by anything else means an earlier request has not been consumed.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use super::{SharedCollaborators, namespace_of, owner_reference};
use crate::constants::LABEL_STAGE_DEPLOY;
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::errors::NotYetProcessed;
use crate::crd::CDStageDeploy;
use crate::store::StoreError;

pub const PUT_DEPLOY_TRIGGER: &str = "put-deploy-trigger";

/// Name of the CI trigger registration of a stage deploy
#[must_use]
pub fn trigger_name(stage_deploy: &str) -> String {
    format!("deploy-{stage_deploy}")
}

fn trigger_data(deploy: &CDStageDeploy) -> BTreeMap<String, String> {
    let mut data = BTreeMap::from([
        ("pipeline".to_string(), deploy.spec.pipeline.clone()),
        ("stage".to_string(), deploy.spec.stage.clone()),
    ]);
    if let Some(tag) = &deploy.spec.tag {
        data.insert("codebase".to_string(), tag.codebase.clone());
        data.insert("tag".to_string(), tag.tag.clone());
    }
    data
}

pub struct PutDeployTrigger {
    collab: SharedCollaborators,
}

impl PutDeployTrigger {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<CDStageDeploy> for PutDeployTrigger {
    fn name(&self) -> &'static str {
        PUT_DEPLOY_TRIGGER
    }

    async fn serve_request(&self, _ctx: &RequestContext, deploy: &mut CDStageDeploy) -> Result<()> {
        let namespace = namespace_of(deploy)?;
        let name = trigger_name(&deploy.name_any());
        let data = trigger_data(deploy);
        let config_maps = &self.collab.config_maps;

        if let Some(mut existing) = config_maps.get(&namespace, &name).await? {
            let owned = deploy.uid().is_some_and(|uid| {
                existing
                    .owner_references()
                    .iter()
                    .any(|owner| owner.uid == uid)
            });
            if !owned {
                return Err(NotYetProcessed::new(ConfigMap::kind(&()), name).into());
            }
            if existing.data.as_ref() != Some(&data) {
                existing.data = Some(data);
                config_maps.replace(&existing).await?;
                info!(trigger = %name, "Updated deploy trigger");
            } else {
                debug!(trigger = %name, "Deploy trigger already registered");
            }
            return Ok(());
        }

        let trigger = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(BTreeMap::from([(
                    LABEL_STAGE_DEPLOY.to_string(),
                    deploy.name_any(),
                )])),
                owner_references: Some(vec![owner_reference(deploy)?]),
                ..ObjectMeta::default()
            },
            data: Some(data),
            ..ConfigMap::default()
        };
        match config_maps.create(&namespace, &trigger).await {
            Ok(_) => {
                info!(trigger = %name, "Registered deploy trigger");
                Ok(())
            }
            Err(StoreError::AlreadyExists { .. }) => {
                Err(NotYetProcessed::new(ConfigMap::kind(&()), name).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
