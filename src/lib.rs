//! # Codebase Operator
//!
//! Kubernetes operator that provisions codebases: git repositories,
//! deployment templates, repository webhooks, CI registrations, branches,
//! image streams and stage deploy triggers.
//!
//! ## Entity kinds
//!
//! - `Codebase` - a repository and its CI wiring
//! - `CodebaseBranch` - a branch of a codebase and its image stream
//! - `CodebaseImageStream` - image tags; labels request stage deploys
//! - `CDStageDeploy` - a deploy request handed to CI
//!
//! Each kind is driven by the same reconciliation loop
//! ([`controller::reconciler::Reconciler`]) running a chain of idempotent
//! handlers picked by the chain factory.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod server;
pub mod store;
