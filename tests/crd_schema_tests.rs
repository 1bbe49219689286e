//! # CRD Schema Tests
//!
//! Manifests as users write them, and the generated definitions the
//! `crdgen` binary emits.

use codebase_operator::crd::{
    CDStageDeploy, CiTool, Codebase, CodebaseBranch, CodebaseImageStream, GitProviderKind,
    GitServer, JenkinsFolder, Strategy,
};
use kube::core::CustomResourceExt;

#[test]
fn test_codebase_manifest_parses_with_defaults() {
    let manifest = r#"
apiVersion: v2.edp.epam.com/v1
kind: Codebase
metadata:
  name: payments
  namespace: platform
spec:
  type: library
  lang: Java
  buildTool: maven
  strategy: clone
  repository:
    url: https://github.com/example/payments.git
  gitServer: gitlab
  gitUrlPath: /platform/payments
  ciTool: GitLab CI
"#;
    let codebase: Codebase = serde_yaml::from_str(manifest).unwrap();

    assert_eq!(codebase.spec.codebase_type, "library");
    assert_eq!(codebase.spec.strategy, Strategy::Clone);
    assert_eq!(codebase.spec.ci(), CiTool::GitlabCi);
    assert_eq!(codebase.spec.language(), "java");
    assert_eq!(codebase.spec.project_path("payments"), "platform/payments");
    assert_eq!(
        codebase.spec.repository.unwrap().url,
        "https://github.com/example/payments.git"
    );
    // Defaults
    assert_eq!(codebase.spec.default_branch, "master");
    assert_eq!(codebase.spec.deployment_script, "helm-chart");
    assert_eq!(codebase.spec.versioning.versioning_type, "default");
    assert!(!codebase.spec.empty_project);
    assert!(codebase.status.is_none());
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let manifest = r"
apiVersion: v2.edp.epam.com/v1
kind: Codebase
metadata:
  name: payments
spec:
  lang: java
  strategy: fork
  gitServer: gitlab
";
    assert!(serde_yaml::from_str::<Codebase>(manifest).is_err());
}

#[test]
fn test_git_server_manifest_defaults() {
    let manifest = r"
apiVersion: v2.edp.epam.com/v1
kind: GitServer
metadata:
  name: gerrit
  namespace: platform
spec:
  gitHost: gerrit.example.com
  sshPort: 29418
  nameSshKeySecret: gerrit-ciuser-sshkey
";
    let server: GitServer = serde_yaml::from_str(manifest).unwrap();

    assert_eq!(server.spec.git_provider, GitProviderKind::Gerrit);
    assert_eq!(server.spec.https_base(), "https://gerrit.example.com");
    assert_eq!(
        server.spec.ssh_url("/payments"),
        format!("ssh://{}@gerrit.example.com:29418/payments", server.spec.git_user)
    );
    assert!(server.spec.webhook_url.is_none());
}

#[test]
fn test_image_stream_manifest_picks_latest_tag() {
    let manifest = r#"
apiVersion: v2.edp.epam.com/v1
kind: CodebaseImageStream
metadata:
  name: payments-master
  labels:
    mypipeline/dev: ""
spec:
  codebase: payments
  imageName: registry.example.com/platform/payments
  tags:
    - name: 0.1.0-SNAPSHOT.3
      created: "2026-03-03T10:00:00Z"
    - name: 0.1.0-SNAPSHOT.1
      created: "2026-03-01T10:00:00Z"
"#;
    let stream: CodebaseImageStream = serde_yaml::from_str(manifest).unwrap();

    assert_eq!(stream.spec.latest_tag().unwrap().name, "0.1.0-SNAPSHOT.3");
}

#[test]
fn test_generated_definitions() {
    let expected = [
        (Codebase::crd(), "codebases.v2.edp.epam.com", "cb"),
        (CodebaseBranch::crd(), "codebasebranches.v2.edp.epam.com", "cbb"),
        (
            CodebaseImageStream::crd(),
            "codebaseimagestreams.v2.edp.epam.com",
            "cbis",
        ),
        (CDStageDeploy::crd(), "cdstagedeploys.v2.edp.epam.com", "csd"),
        (GitServer::crd(), "gitservers.v2.edp.epam.com", "gs"),
        (JenkinsFolder::crd(), "jenkinsfolders.v2.edp.epam.com", "jf"),
    ];

    for (crd, name, short) in expected {
        assert_eq!(crd.metadata.name.as_deref(), Some(name));
        assert_eq!(crd.spec.group, "v2.edp.epam.com");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.short_names, Some(vec![short.to_string()]));
    }
}

#[test]
fn test_tracked_kinds_have_status_subresource() {
    for crd in [
        Codebase::crd(),
        CodebaseBranch::crd(),
        CodebaseImageStream::crd(),
        CDStageDeploy::crd(),
    ] {
        let version = &crd.spec.versions[0];
        assert!(
            version
                .subresources
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .is_some(),
            "{} has no status subresource",
            crd.spec.names.kind
        );
    }
}

#[test]
fn test_codebase_definition_prints_failures() {
    let crd = Codebase::crd();
    let columns = crd.spec.versions[0]
        .additional_printer_columns
        .clone()
        .unwrap_or_default();
    let paths: Vec<&str> = columns.iter().map(|c| c.json_path.as_str()).collect();

    assert!(paths.contains(&".status.value"));
    assert!(paths.contains(&".status.failureCount"));
}
