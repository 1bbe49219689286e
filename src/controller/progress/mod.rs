//! # Progress
//!
//! Per-entity progress markers that let handlers skip work already done.
//!
//! A marker lives either in the entity's own status (`status.git`) or in an
//! external key-value store keyed by `(name, scope)`. It only ever moves
//! forward; a handler that sees its own milestone reached does nothing.
//!
//! Markers are not removed when their entity is deleted.

mod marker;
mod memory;
mod postgres;

pub use marker::{ProgressMarker, UnknownMarker};
pub use memory::MemoryProgressStore;
pub use postgres::PgProgressStore;

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use kube::ResourceExt;
use thiserror::Error;
use tracing::debug;

use crate::crd::ProgressCarrier;

/// External marker storage
#[async_trait]
pub trait ProgressStore: Send + Sync + fmt::Debug {
    async fn get_marker(&self, name: &str, scope: &str) -> anyhow::Result<Option<String>>;
    async fn set_marker(&self, value: &str, name: &str, scope: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("progress marker cannot move back from {current} to {requested}")]
    Backwards {
        current: ProgressMarker,
        requested: ProgressMarker,
    },
    #[error("progress marker {requested} does not follow {current}")]
    Incomparable {
        current: ProgressMarker,
        requested: ProgressMarker,
    },
}

/// Where markers are read from and written to
#[derive(Clone)]
pub enum ProgressTracker {
    /// `status.git` of the entity itself
    Status,
    /// An external store; `scope` overrides the entity namespace as scope
    External {
        store: Arc<dyn ProgressStore>,
        scope: Option<String>,
    },
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressTracker::Status => f.write_str("ProgressTracker::Status"),
            ProgressTracker::External { store, scope } => f
                .debug_struct("ProgressTracker::External")
                .field("store", store)
                .field("scope", scope)
                .finish(),
        }
    }
}

impl ProgressTracker {
    pub fn external(store: Arc<dyn ProgressStore>, scope: Option<String>) -> Self {
        ProgressTracker::External { store, scope }
    }

    /// Current marker of the entity
    pub async fn current<E>(&self, entity: &E) -> anyhow::Result<ProgressMarker>
    where
        E: ProgressCarrier + ResourceExt,
    {
        let raw = match self {
            ProgressTracker::Status => entity.progress_marker().map(str::to_string),
            ProgressTracker::External { store, scope } => {
                let scope = scope.clone().unwrap_or_else(|| entity.namespace().unwrap_or_default());
                store
                    .get_marker(&entity.progress_key(), &scope)
                    .await
                    .context("Failed to read progress marker")?
            }
        };
        Ok(raw
            .as_deref()
            .unwrap_or_default()
            .parse::<ProgressMarker>()?)
    }

    /// Whether the entity is at or past `milestone`
    pub async fn reached<E>(&self, entity: &E, milestone: ProgressMarker) -> anyhow::Result<bool>
    where
        E: ProgressCarrier + ResourceExt,
    {
        Ok(self.current(entity).await?.reached(milestone))
    }

    /// Move the marker forward to `milestone`
    ///
    /// Re-setting the current marker is a no-op. The value is mirrored into
    /// the entity status so it is visible on the resource either way.
    pub async fn advance<E>(&self, entity: &mut E, milestone: ProgressMarker) -> anyhow::Result<()>
    where
        E: ProgressCarrier + ResourceExt,
    {
        let current = self.current(entity).await?;
        match current.partial_cmp(&milestone) {
            Some(std::cmp::Ordering::Equal) => return Ok(()),
            Some(std::cmp::Ordering::Less) => {}
            Some(std::cmp::Ordering::Greater) => {
                return Err(ProgressError::Backwards {
                    current,
                    requested: milestone,
                }
                .into());
            }
            None => {
                return Err(ProgressError::Incomparable {
                    current,
                    requested: milestone,
                }
                .into());
            }
        }

        if let ProgressTracker::External { store, scope } = self {
            let scope = scope.clone().unwrap_or_else(|| entity.namespace().unwrap_or_default());
            store
                .set_marker(milestone.as_str(), &entity.progress_key(), &scope)
                .await
                .context("Failed to write progress marker")?;
        }
        entity.set_progress_marker(milestone.as_str());

        debug!(
            resource.name = %entity.name_any(),
            from = %current,
            to = %milestone,
            "Progress marker advanced"
        );
        Ok(())
    }
}
