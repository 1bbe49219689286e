//! # Provisioners
//!
//! Per-kind knowledge the generic reconciler needs: static spec checks, the
//! chains to run and how `NotYetProcessed` is treated. Chains are built once
//! when the provisioner is created.

use crate::controller::chain::Chain;
use crate::controller::chain::factory::{
    self, CodebaseChainKind, select_chain,
};
use crate::controller::handlers::SharedCollaborators;
use crate::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, SUPPORTED_LANGUAGES, Strategy,
};

use super::types::NotYetProcessedPolicy;

pub trait Provisioner<K: Send>: Send + Sync {
    /// Static spec checks; an invalid entity is skipped without a status change
    fn validate(&self, entity: &K) -> Result<(), String>;

    fn chain(&self, entity: &K) -> &Chain<K>;

    fn deletion_chain(&self) -> &Chain<K>;

    fn not_yet_processed(&self) -> NotYetProcessedPolicy {
        NotYetProcessedPolicy::Fail
    }
}

fn require(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

pub fn validate_codebase(codebase: &Codebase) -> Result<(), String> {
    let spec = &codebase.spec;
    let lang = spec.language();
    if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
        return Err(format!("unsupported language {}", spec.lang));
    }
    require(&spec.git_server, "gitServer")?;
    match spec.strategy {
        Strategy::Create if lang == "other" => {
            Err("create strategy needs a language with templates".to_string())
        }
        Strategy::Clone
            if spec
                .repository
                .as_ref()
                .is_none_or(|r| r.url.trim().is_empty()) =>
        {
            Err("clone strategy requires repository.url".to_string())
        }
        Strategy::Import
            if spec
                .git_url_path
                .as_deref()
                .is_none_or(|p| p.trim_matches('/').is_empty()) =>
        {
            Err("import strategy requires gitUrlPath".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_branch(branch: &CodebaseBranch) -> Result<(), String> {
    require(&branch.spec.codebase_name, "codebaseName")?;
    require(&branch.spec.branch_name, "branchName")
}

pub fn validate_image_stream(stream: &CodebaseImageStream) -> Result<(), String> {
    require(&stream.spec.codebase, "codebase")
}

pub fn validate_stage_deploy(deploy: &CDStageDeploy) -> Result<(), String> {
    require(&deploy.spec.pipeline, "pipeline")?;
    require(&deploy.spec.stage, "stage")?;
    match &deploy.spec.tag {
        Some(tag) => {
            require(&tag.codebase, "tag.codebase")?;
            require(&tag.tag, "tag.tag")
        }
        None => Err("tag must be set".to_string()),
    }
}

#[derive(Debug)]
pub struct CodebaseProvisioner {
    gerrit: Chain<Codebase>,
    tekton: Chain<Codebase>,
    tekton_import: Chain<Codebase>,
    gitlab_ci: Chain<Codebase>,
    third_party: Chain<Codebase>,
    deletion: Chain<Codebase>,
}

impl CodebaseProvisioner {
    pub fn new(collab: &SharedCollaborators) -> Self {
        let build = |kind| factory::build_codebase_chain(kind, collab);
        Self {
            gerrit: build(CodebaseChainKind::Gerrit),
            tekton: build(CodebaseChainKind::Tekton),
            tekton_import: build(CodebaseChainKind::TektonImport),
            gitlab_ci: build(CodebaseChainKind::GitlabCi),
            third_party: build(CodebaseChainKind::ThirdParty),
            deletion: factory::codebase_deletion_chain(collab),
        }
    }
}

impl Provisioner<Codebase> for CodebaseProvisioner {
    fn validate(&self, entity: &Codebase) -> Result<(), String> {
        validate_codebase(entity)
    }

    fn chain(&self, entity: &Codebase) -> &Chain<Codebase> {
        match select_chain(entity.spec.strategy, entity.spec.ci()) {
            CodebaseChainKind::Gerrit => &self.gerrit,
            CodebaseChainKind::Tekton => &self.tekton,
            CodebaseChainKind::TektonImport => &self.tekton_import,
            CodebaseChainKind::GitlabCi => &self.gitlab_ci,
            CodebaseChainKind::ThirdParty => &self.third_party,
        }
    }

    fn deletion_chain(&self) -> &Chain<Codebase> {
        &self.deletion
    }
}

#[derive(Debug)]
pub struct BranchProvisioner {
    chain: Chain<CodebaseBranch>,
    deletion: Chain<CodebaseBranch>,
}

impl BranchProvisioner {
    pub fn new(collab: &SharedCollaborators) -> Self {
        Self {
            chain: factory::branch_chain(collab),
            deletion: factory::branch_deletion_chain(collab),
        }
    }
}

impl Provisioner<CodebaseBranch> for BranchProvisioner {
    fn validate(&self, entity: &CodebaseBranch) -> Result<(), String> {
        validate_branch(entity)
    }

    fn chain(&self, _entity: &CodebaseBranch) -> &Chain<CodebaseBranch> {
        &self.chain
    }

    fn deletion_chain(&self) -> &Chain<CodebaseBranch> {
        &self.deletion
    }
}

/// Stage deploys already requested are waited on, not counted as failures
#[derive(Debug)]
pub struct ImageStreamProvisioner {
    chain: Chain<CodebaseImageStream>,
    deletion: Chain<CodebaseImageStream>,
}

impl ImageStreamProvisioner {
    pub fn new(collab: &SharedCollaborators) -> Self {
        Self {
            chain: factory::image_stream_chain(collab),
            deletion: Chain::new(),
        }
    }
}

impl Provisioner<CodebaseImageStream> for ImageStreamProvisioner {
    fn validate(&self, entity: &CodebaseImageStream) -> Result<(), String> {
        validate_image_stream(entity)
    }

    fn chain(&self, _entity: &CodebaseImageStream) -> &Chain<CodebaseImageStream> {
        &self.chain
    }

    fn deletion_chain(&self) -> &Chain<CodebaseImageStream> {
        &self.deletion
    }

    fn not_yet_processed(&self) -> NotYetProcessedPolicy {
        NotYetProcessedPolicy::Postpone
    }
}

/// A foreign deploy trigger counts as a failure
#[derive(Debug)]
pub struct StageDeployProvisioner {
    chain: Chain<CDStageDeploy>,
    deletion: Chain<CDStageDeploy>,
}

impl StageDeployProvisioner {
    pub fn new(collab: &SharedCollaborators) -> Self {
        Self {
            chain: factory::stage_deploy_chain(collab),
            deletion: Chain::new(),
        }
    }
}

impl Provisioner<CDStageDeploy> for StageDeployProvisioner {
    fn validate(&self, entity: &CDStageDeploy) -> Result<(), String> {
        validate_stage_deploy(entity)
    }

    fn chain(&self, _entity: &CDStageDeploy) -> &Chain<CDStageDeploy> {
        &self.chain
    }

    fn deletion_chain(&self) -> &Chain<CDStageDeploy> {
        &self.deletion
    }
}

/// Fixed chains with no spec checks
///
/// Lets callers drive the reconciler with hand-built chains.
#[derive(Debug)]
pub struct StaticProvisioner<K: Send> {
    chain: Chain<K>,
    deletion: Chain<K>,
    policy: NotYetProcessedPolicy,
}

impl<K: Send> StaticProvisioner<K> {
    pub fn new(chain: Chain<K>) -> Self {
        Self {
            chain,
            deletion: Chain::new(),
            policy: NotYetProcessedPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_deletion(mut self, deletion: Chain<K>) -> Self {
        self.deletion = deletion;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: NotYetProcessedPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<K: Send> Provisioner<K> for StaticProvisioner<K> {
    fn validate(&self, _entity: &K) -> Result<(), String> {
        Ok(())
    }

    fn chain(&self, _entity: &K) -> &Chain<K> {
        &self.chain
    }

    fn deletion_chain(&self) -> &Chain<K> {
        &self.deletion
    }

    fn not_yet_processed(&self) -> NotYetProcessedPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CodebaseBranchSpec, CodebaseSpec, CodebaseTag, CDStageDeploySpec, Repository};

    fn codebase(lang: &str, strategy: Strategy) -> Codebase {
        Codebase::new(
            "payments",
            CodebaseSpec {
                lang: lang.to_string(),
                description: None,
                framework: None,
                build_tool: "maven".to_string(),
                strategy,
                repository: None,
                git_server: "gerrit".to_string(),
                git_url_path: None,
                ci_tool: "jenkins".to_string(),
                codebase_type: "application".to_string(),
                default_branch: "master".to_string(),
                deployment_script: "helm-chart".to_string(),
                versioning: Default::default(),
                job_provisioning: None,
                disable_put_deploy_templates: false,
                empty_project: false,
            },
        )
    }

    #[test]
    fn test_codebase_language_and_strategy_rules() {
        assert!(validate_codebase(&codebase("java", Strategy::Create)).is_ok());
        assert!(validate_codebase(&codebase("Java", Strategy::Create)).is_ok());
        assert!(validate_codebase(&codebase("cobol", Strategy::Create)).is_err());
        assert!(validate_codebase(&codebase("other", Strategy::Create)).is_err());

        let mut clone = codebase("java", Strategy::Clone);
        assert!(validate_codebase(&clone).is_err());
        clone.spec.repository = Some(Repository {
            url: "https://github.com/example/payments.git".to_string(),
        });
        assert!(validate_codebase(&clone).is_ok());

        let mut import = codebase("other", Strategy::Import);
        assert!(validate_codebase(&import).is_err());
        import.spec.git_url_path = Some("/team/payments".to_string());
        assert!(validate_codebase(&import).is_ok());
    }

    #[test]
    fn test_branch_and_stage_deploy_rules() {
        let branch = CodebaseBranch::new(
            "payments-master",
            CodebaseBranchSpec {
                codebase_name: "payments".to_string(),
                branch_name: " ".to_string(),
                from_commit: String::new(),
                release: false,
                version: None,
            },
        );
        assert_eq!(
            validate_branch(&branch),
            Err("branchName must not be empty".to_string())
        );

        let mut deploy = CDStageDeploy::new(
            "mypipeline-dev",
            CDStageDeploySpec {
                pipeline: "mypipeline".to_string(),
                stage: "dev".to_string(),
                tag: None,
            },
        );
        assert!(validate_stage_deploy(&deploy).is_err());
        deploy.spec.tag = Some(CodebaseTag {
            codebase: "payments".to_string(),
            tag: "1.0.0".to_string(),
        });
        assert!(validate_stage_deploy(&deploy).is_ok());
    }
}
