//! # Deployment Templates
//!
//! Renders deployment templates and CI definitions from the assets directory.
//!
//! ```text
//! <assets>/templates/<lang>/<deployment script>/...   -> <checkout>/deploy-templates/...
//! <assets>/gitlab-ci/<lang>/<build tool>.gitlab-ci.yml
//! <assets>/gitlab-ci/<lang>.gitlab-ci.yml
//! ```
//!
//! Placeholders use the `{{name}}` form. Files that are not valid UTF-8 are
//! copied unchanged.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use kube::ResourceExt;
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::{DEFAULT_START_VERSION, DEPLOY_TEMPLATES_DIR};
use crate::crd::Codebase;

#[derive(Debug, Clone)]
pub struct DeployTemplates {
    assets_dir: PathBuf,
}

impl DeployTemplates {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Source directory of the templates for a codebase
    #[must_use]
    pub fn template_dir(&self, codebase: &Codebase) -> PathBuf {
        self.assets_dir
            .join("templates")
            .join(codebase.spec.language())
            .join(codebase.spec.deployment_script.to_lowercase())
    }

    /// Render the templates of `codebase` into `<checkout>/deploy-templates`
    ///
    /// Returns the number of files written.
    pub async fn render(&self, codebase: &Codebase, checkout: &Path) -> Result<usize> {
        let source = self.template_dir(codebase);
        let destination = checkout.join(DEPLOY_TEMPLATES_DIR);
        let values = placeholders(codebase);

        tokio::task::spawn_blocking(move || render_tree(&source, &destination, &values))
            .await
            .context("Template rendering task panicked")?
    }

    /// GitLab CI definition for a language, preferring the build-tool specific one
    pub async fn gitlab_ci_template(&self, lang: &str, build_tool: &str) -> Result<String> {
        let lang = lang.to_lowercase();
        let base = self.assets_dir.join("gitlab-ci");
        let candidates = [
            base.join(&lang)
                .join(format!("{}.gitlab-ci.yml", build_tool.to_lowercase())),
            base.join(format!("{lang}.gitlab-ci.yml")),
        ];

        for candidate in &candidates {
            match tokio::fs::read_to_string(candidate).await {
                Ok(content) => return Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to read {}", candidate.display()));
                }
            }
        }
        bail!("no GitLab CI template for language {lang} (build tool {build_tool})")
    }
}

fn placeholders(codebase: &Codebase) -> Vec<(String, String)> {
    let spec = &codebase.spec;
    let version = spec
        .versioning
        .start_from
        .clone()
        .unwrap_or_else(|| DEFAULT_START_VERSION.to_string());
    [
        ("name", codebase.name_any()),
        ("namespace", codebase.namespace().unwrap_or_default()),
        ("lang", spec.language()),
        ("framework", spec.framework.clone().unwrap_or_default()),
        ("buildTool", spec.build_tool.clone()),
        ("defaultBranch", spec.default_branch.clone()),
        ("version", version),
    ]
    .into_iter()
    .map(|(key, value)| (format!("{{{{{key}}}}}"), value))
    .collect()
}

fn substitute(content: &str, values: &[(String, String)]) -> String {
    values
        .iter()
        .fold(content.to_string(), |acc, (key, value)| acc.replace(key, value))
}

fn render_tree(source: &Path, destination: &Path, values: &[(String, String)]) -> Result<usize> {
    if !source.is_dir() {
        bail!("template directory {} does not exist", source.display());
    }

    let mut written = 0;
    for entry in WalkDir::new(source).into_iter() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("Template path outside of template directory")?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            continue;
        }

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let output = match String::from_utf8(bytes) {
            Ok(text) => substitute(&text, values).into_bytes(),
            Err(raw) => raw.into_bytes(),
        };
        std::fs::write(&target, output)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written += 1;
    }

    debug!(
        source = %source.display(),
        destination = %destination.display(),
        files = written,
        "Rendered deployment templates"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CodebaseSpec, Strategy, Versioning};

    fn codebase() -> Codebase {
        let mut codebase = Codebase::new(
            "payments",
            CodebaseSpec {
                lang: "Java".to_string(),
                description: None,
                framework: Some("java17".to_string()),
                build_tool: "maven".to_string(),
                strategy: Strategy::Create,
                repository: None,
                git_server: "gerrit".to_string(),
                git_url_path: None,
                ci_tool: "jenkins".to_string(),
                codebase_type: "application".to_string(),
                default_branch: "main".to_string(),
                deployment_script: "helm-chart".to_string(),
                versioning: Versioning::default(),
                job_provisioning: None,
                disable_put_deploy_templates: false,
                empty_project: false,
            },
        );
        codebase.metadata.namespace = Some("platform".to_string());
        codebase
    }

    #[tokio::test]
    async fn test_render_substitutes_placeholders() {
        let assets = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        let chart = assets.path().join("templates/java/helm-chart/templates");
        std::fs::create_dir_all(&chart).unwrap();
        std::fs::write(
            assets.path().join("templates/java/helm-chart/Chart.yaml"),
            "name: {{name}}\nversion: {{version}}\n",
        )
        .unwrap();
        std::fs::write(chart.join("deployment.yaml"), "namespace: {{namespace}}\n").unwrap();
        std::fs::write(chart.join("logo.bin"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let templates = DeployTemplates::new(assets.path());
        let count = templates.render(&codebase(), checkout.path()).await.unwrap();

        assert_eq!(count, 3);
        let rendered = checkout.path().join(DEPLOY_TEMPLATES_DIR);
        assert_eq!(
            std::fs::read_to_string(rendered.join("Chart.yaml")).unwrap(),
            "name: payments\nversion: 0.0.1\n"
        );
        assert_eq!(
            std::fs::read_to_string(rendered.join("templates/deployment.yaml")).unwrap(),
            "namespace: platform\n"
        );
        assert_eq!(
            std::fs::read(rendered.join("templates/logo.bin")).unwrap(),
            vec![0xff_u8, 0xfe, 0x00]
        );
    }

    #[tokio::test]
    async fn test_render_fails_without_templates() {
        let assets = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        let templates = DeployTemplates::new(assets.path());
        assert!(templates.render(&codebase(), checkout.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_gitlab_ci_template_falls_back_to_language() {
        let assets = tempfile::tempdir().unwrap();
        let dir = assets.path().join("gitlab-ci/java");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("maven.gitlab-ci.yml"), "maven").unwrap();
        std::fs::write(assets.path().join("gitlab-ci/go.gitlab-ci.yml"), "go").unwrap();

        let templates = DeployTemplates::new(assets.path());
        assert_eq!(templates.gitlab_ci_template("Java", "Maven").await.unwrap(), "maven");
        assert_eq!(templates.gitlab_ci_template("go", "go").await.unwrap(), "go");
        assert!(templates.gitlab_ci_template("python", "pip").await.is_err());
    }
}
