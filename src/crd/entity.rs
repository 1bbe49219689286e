//! # Tracked Entities
//!
//! The common surface the reconciliation loop needs from every entity kind.

use std::fmt::Debug;

use kube::{Resource, ResourceExt};
use kube::core::NamespaceResourceScope;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::status::{EntityStatus, value};
use super::{CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream};

/// A desired-state resource driven by the reconciliation loop
pub trait TrackedEntity:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Finalizer guarding cleanup of this kind
    const FINALIZER: &'static str;
    /// `status.value` written on successful provisioning
    const SUCCESS_VALUE: &'static str;

    fn entity_status(&self) -> Option<&EntityStatus>;

    /// Mutable status, created empty when absent
    fn entity_status_mut(&mut self) -> &mut EntityStatus;

    fn failure_count(&self) -> i64 {
        self.entity_status().map_or(0, |s| s.failure_count)
    }
}

/// An entity whose progress marker can live in its own status (`status.git`)
pub trait ProgressCarrier {
    /// Key of the marker in an external progress store
    fn progress_key(&self) -> String;
    fn progress_marker(&self) -> Option<&str>;
    fn set_progress_marker(&mut self, marker: &str);
}

impl TrackedEntity for Codebase {
    const FINALIZER: &'static str = "codebase.operator.finalizer.name";
    const SUCCESS_VALUE: &'static str = value::ACTIVE;

    fn entity_status(&self) -> Option<&EntityStatus> {
        self.status.as_ref().map(|s| &s.common)
    }

    fn entity_status_mut(&mut self) -> &mut EntityStatus {
        &mut self.status.get_or_insert_with(Default::default).common
    }
}

impl ProgressCarrier for Codebase {
    fn progress_key(&self) -> String {
        self.name_any()
    }

    fn progress_marker(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.git.as_deref())
    }

    fn set_progress_marker(&mut self, marker: &str) {
        self.status.get_or_insert_with(Default::default).git = Some(marker.to_string());
    }
}

impl TrackedEntity for CodebaseBranch {
    const FINALIZER: &'static str = "codebasebranch.operator.finalizer.name";
    const SUCCESS_VALUE: &'static str = value::ACTIVE;

    fn entity_status(&self) -> Option<&EntityStatus> {
        self.status.as_ref().map(|s| &s.common)
    }

    fn entity_status_mut(&mut self) -> &mut EntityStatus {
        &mut self.status.get_or_insert_with(Default::default).common
    }
}

impl ProgressCarrier for CodebaseBranch {
    fn progress_key(&self) -> String {
        format!("{}/{}", self.spec.codebase_name, self.spec.branch_name)
    }

    fn progress_marker(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.git.as_deref())
    }

    fn set_progress_marker(&mut self, marker: &str) {
        self.status.get_or_insert_with(Default::default).git = Some(marker.to_string());
    }
}

impl TrackedEntity for CodebaseImageStream {
    const FINALIZER: &'static str = "codebaseimagestream.operator.finalizer.name";
    const SUCCESS_VALUE: &'static str = value::ACTIVE;

    fn entity_status(&self) -> Option<&EntityStatus> {
        self.status.as_ref()
    }

    fn entity_status_mut(&mut self) -> &mut EntityStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl TrackedEntity for CDStageDeploy {
    const FINALIZER: &'static str = "cdstagedeploy.operator.finalizer.name";
    const SUCCESS_VALUE: &'static str = value::FINISHED;

    fn entity_status(&self) -> Option<&EntityStatus> {
        self.status.as_ref()
    }

    fn entity_status_mut(&mut self) -> &mut EntityStatus {
        self.status.get_or_insert_with(Default::default)
    }
}
