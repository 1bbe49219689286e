//! # CodebaseImageStream Handlers
//!
//! Labels of the form `<pipeline>/<stage>` on an image stream request that
//! the stream's latest tag is deployed to that stage. Each request becomes a
//! `CDStageDeploy` named `<pipeline>-<stage>`.

use anyhow::Result;
use async_trait::async_trait;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use super::{SharedCollaborators, namespace_of, owner_reference};
use crate::controller::chain::{Handler, RequestContext};
use crate::controller::errors::NotYetProcessed;
use crate::crd::{
    CDStageDeploy, CDStageDeploySpec, CodebaseImageStream, CodebaseTag, TrackedEntity, value,
    stage_deploy_name,
};
use crate::store::StoreError;

pub const PUT_CD_STAGE_DEPLOY: &str = "put-cd-stage-deploy";

/// `(pipeline, stage)` pairs requested through labels
///
/// Prefixed labels such as `app.kubernetes.io/name` are not stage requests.
#[must_use]
pub fn stage_labels(stream: &CodebaseImageStream) -> Vec<(String, String)> {
    stream
        .labels()
        .keys()
        .filter_map(|key| key.split_once('/'))
        .filter(|(pipeline, stage)| {
            !pipeline.is_empty() && !stage.is_empty() && !pipeline.contains('.')
        })
        .map(|(pipeline, stage)| (pipeline.to_string(), stage.to_string()))
        .collect()
}

pub struct PutCdStageDeploy {
    collab: SharedCollaborators,
}

impl PutCdStageDeploy {
    pub fn new(collab: SharedCollaborators) -> Self {
        Self { collab }
    }
}

#[async_trait]
impl Handler<CodebaseImageStream> for PutCdStageDeploy {
    fn name(&self) -> &'static str {
        PUT_CD_STAGE_DEPLOY
    }

    async fn serve_request(
        &self,
        _ctx: &RequestContext,
        stream: &mut CodebaseImageStream,
    ) -> Result<()> {
        let Some(latest) = stream.spec.latest_tag() else {
            debug!(image_stream = %stream.name_any(), "No tags to deploy");
            return Ok(());
        };
        let wanted = CodebaseTag {
            codebase: stream.spec.codebase.clone(),
            tag: latest.name.clone(),
        };
        let namespace = namespace_of(stream)?;
        let stage_deploys = &self.collab.stage_deploys;

        for (pipeline, stage) in stage_labels(stream) {
            let name = stage_deploy_name(&pipeline, &stage);

            if let Some(existing) = stage_deploys.get(&namespace, &name).await? {
                if existing.spec.tag.as_ref() == Some(&wanted) {
                    debug!(stage_deploy = %name, tag = %wanted.tag, "Stage deploy already requested");
                    continue;
                }
                let finished = existing
                    .entity_status()
                    .is_some_and(|s| s.value == value::FINISHED);
                if finished {
                    stage_deploys.delete(&namespace, &name).await?;
                    info!(stage_deploy = %name, "Removed finished stage deploy of an older tag");
                }
                return Err(NotYetProcessed::new(CDStageDeploy::kind(&()), name).into());
            }

            let deploy = CDStageDeploy {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(namespace.clone()),
                    owner_references: Some(vec![owner_reference(stream)?]),
                    ..ObjectMeta::default()
                },
                spec: CDStageDeploySpec {
                    pipeline,
                    stage,
                    tag: Some(wanted.clone()),
                },
                status: None,
            };
            match stage_deploys.create(&namespace, &deploy).await {
                Ok(_) => info!(stage_deploy = %name, tag = %wanted.tag, "Created stage deploy"),
                Err(StoreError::AlreadyExists { .. }) => {
                    return Err(NotYetProcessed::new(CDStageDeploy::kind(&()), name).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
