//! # Chain Factory
//!
//! Picks and assembles the handler chain for an entity.
//!
//! Selection is a pure function of the codebase strategy and CI tool:
//!
//! | strategy        | CI tool    | chain          |
//! |-----------------|------------|----------------|
//! | `import`        | GitLab CI  | `GitlabCi`     |
//! | `import`        | Tekton     | `TektonImport` |
//! | `import`        | other      | `ThirdParty`   |
//! | `create`/`clone`| Tekton     | `Tekton`       |
//! | `create`/`clone`| other      | `Gerrit`       |

use crate::controller::chain::Chain;
use crate::controller::handlers::SharedCollaborators;
use crate::controller::handlers::branch::{
    CheckParentCodebase, PutBranchInGit, PutCodebaseImageStream, RunCleanupJob,
};
use crate::controller::handlers::codebase::{
    CheckProjectExists, DeleteWebHook, PutDefaultBranch, PutDeployConfigs, PutGitlabCiFile,
    PutJenkinsFolder, PutProject, PutProjectGerrit, PutVersionFile, PutWebHook,
};
use crate::controller::handlers::image_stream::PutCdStageDeploy;
use crate::controller::handlers::stage_deploy::PutDeployTrigger;
use crate::controller::handlers::workdir::RemoveWorkdir;
use crate::crd::{
    CDStageDeploy, CiTool, Codebase, CodebaseBranch, CodebaseImageStream, Strategy,
};

/// Provisioning pipelines available for codebases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodebaseChainKind {
    /// Legacy pipeline: Gerrit project, templates, version file, Jenkins folder
    Gerrit,
    /// Hosted provider project with webhook, created or cloned
    Tekton,
    /// Existing hosted provider project with webhook
    TektonImport,
    /// Existing project driven by GitLab CI
    GitlabCi,
    /// Existing project on any other VCS, driven by Jenkins
    ThirdParty,
}

#[must_use]
pub fn select_chain(strategy: Strategy, ci_tool: CiTool) -> CodebaseChainKind {
    match (strategy, ci_tool) {
        (Strategy::Import, CiTool::GitlabCi) => CodebaseChainKind::GitlabCi,
        (Strategy::Import, CiTool::Tekton) => CodebaseChainKind::TektonImport,
        (Strategy::Import, CiTool::Jenkins) => CodebaseChainKind::ThirdParty,
        (Strategy::Create | Strategy::Clone, CiTool::Tekton) => CodebaseChainKind::Tekton,
        (Strategy::Create | Strategy::Clone, CiTool::Jenkins | CiTool::GitlabCi) => {
            CodebaseChainKind::Gerrit
        }
    }
}

/// Chain selected for a codebase
#[must_use]
pub fn codebase_chain(codebase: &Codebase, collab: &SharedCollaborators) -> Chain<Codebase> {
    build_codebase_chain(
        select_chain(codebase.spec.strategy, codebase.spec.ci()),
        collab,
    )
}

#[must_use]
pub fn build_codebase_chain(kind: CodebaseChainKind, collab: &SharedCollaborators) -> Chain<Codebase> {
    let c = || collab.clone();
    match kind {
        CodebaseChainKind::Gerrit => Chain::new()
            .with(PutProjectGerrit::new(c()))
            .with(PutDeployConfigs::new(c()))
            .with(PutVersionFile::new(c()))
            .with(PutJenkinsFolder::new(c()))
            .with(PutDefaultBranch::new(c()))
            .with(RemoveWorkdir::codebase_cleaner(c())),
        CodebaseChainKind::Tekton => Chain::new()
            .with(PutProject::new(c()))
            .with(PutWebHook::new(c()))
            .with(PutDeployConfigs::new(c()))
            .with(PutDefaultBranch::new(c()))
            .with(RemoveWorkdir::codebase_cleaner(c())),
        CodebaseChainKind::TektonImport => Chain::new()
            .with(CheckProjectExists::new(c()))
            .with(PutWebHook::new(c()))
            .with(PutDeployConfigs::new(c()))
            .with(PutDefaultBranch::new(c()))
            .with(RemoveWorkdir::codebase_cleaner(c())),
        CodebaseChainKind::GitlabCi => Chain::new()
            .with(CheckProjectExists::new(c()))
            .with(PutGitlabCiFile::new(c()))
            .with(PutDefaultBranch::new(c()))
            .with(RemoveWorkdir::codebase_cleaner(c())),
        CodebaseChainKind::ThirdParty => Chain::new()
            .with(CheckProjectExists::new(c()))
            .with(PutDeployConfigs::new(c()))
            .with(PutJenkinsFolder::new(c()))
            .with(PutDefaultBranch::new(c()))
            .with(RemoveWorkdir::codebase_cleaner(c())),
    }
}

#[must_use]
pub fn codebase_deletion_chain(collab: &SharedCollaborators) -> Chain<Codebase> {
    Chain::new()
        .with(DeleteWebHook::new(collab.clone()))
        .with(RemoveWorkdir::codebase_removal(collab.clone()))
}

#[must_use]
pub fn branch_chain(collab: &SharedCollaborators) -> Chain<CodebaseBranch> {
    Chain::new()
        .with(CheckParentCodebase::new(collab.clone()))
        .with(PutBranchInGit::new(collab.clone()))
        .with(PutCodebaseImageStream::new(collab.clone()))
        .with(RemoveWorkdir::branch_cleaner(collab.clone()))
}

#[must_use]
pub fn branch_deletion_chain(collab: &SharedCollaborators) -> Chain<CodebaseBranch> {
    Chain::new()
        .with(RunCleanupJob::new(collab.clone()))
        .with(RemoveWorkdir::branch_removal(collab.clone()))
}

#[must_use]
pub fn image_stream_chain(collab: &SharedCollaborators) -> Chain<CodebaseImageStream> {
    Chain::new().with(PutCdStageDeploy::new(collab.clone()))
}

#[must_use]
pub fn stage_deploy_chain(collab: &SharedCollaborators) -> Chain<CDStageDeploy> {
    Chain::new().with(PutDeployTrigger::new(collab.clone()))
}
