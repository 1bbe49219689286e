//! # Custom Resource Definitions
//!
//! CRD types for the codebase operator.
//!
//! ## Module Structure
//!
//! - `codebase.rs` - Codebase spec, strategy and CI tool
//! - `codebase_branch.rs` - CodebaseBranch
//! - `codebase_image_stream.rs` - CodebaseImageStream and its tags
//! - `cd_stage_deploy.rs` - CDStageDeploy
//! - `git_server.rs` - GitServer connection details
//! - `jenkins_folder.rs` - JenkinsFolder registrations
//! - `status.rs` - Status shared by all tracked entities
//! - `entity.rs` - The `TrackedEntity` surface used by the reconciler

mod cd_stage_deploy;
mod codebase;
mod codebase_branch;
mod codebase_image_stream;
mod entity;
mod git_server;
mod jenkins_folder;
mod status;

// Re-export all public types
pub use cd_stage_deploy::{CDStageDeploy, CDStageDeploySpec, CodebaseTag, stage_deploy_name};
pub use codebase::{
    CiTool, Codebase, CodebaseSpec, CodebaseStatus, Repository, SUPPORTED_LANGUAGES, Strategy,
    Versioning,
};
pub use codebase_branch::{
    CodebaseBranch, CodebaseBranchSpec, CodebaseBranchStatus, sanitize_name,
};
pub use codebase_image_stream::{CodebaseImageStream, CodebaseImageStreamSpec, ImageTag};
pub use entity::{ProgressCarrier, TrackedEntity};
pub use git_server::{GitProviderKind, GitServer, GitServerSpec};
pub use jenkins_folder::{JenkinsFolder, JenkinsFolderSpec, jenkins_folder_name};
pub use status::{ActionResult, EntityStatus, value};
