//! # Reconciler
//!
//! Generic reconciliation of tracked entities.
//!
//! - `reconcile`: the loop itself, one [`Reconciler`] per entity kind
//! - `provisioner`: per-kind chains, spec checks and `NotYetProcessed` policy
//! - `finalizer`: finalizer add/remove with bounded conflict retries
//! - `status`: the status transitions the loop applies
//! - `types`: the error surfaced to the watch loop

pub mod finalizer;
pub mod provisioner;
pub mod reconcile;
pub mod status;
pub mod types;

pub use provisioner::{
    BranchProvisioner, CodebaseProvisioner, ImageStreamProvisioner, Provisioner,
    StageDeployProvisioner, StaticProvisioner,
};
pub use reconcile::Reconciler;
pub use types::{NotYetProcessedPolicy, ReconcilerError};
