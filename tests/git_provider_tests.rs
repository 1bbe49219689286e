//! # Git Provider Client Tests
//!
//! GitLab and GitHub REST clients against a wiremock server.

mod common;

use codebase_operator::provider::{GitHubProvider, GitLabProvider, GitProvider, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = r"^/api/v4/projects/team(%2F|/)svc$";
const HOOKS: &str = r"^/api/v4/projects/team(%2F|/)svc/hooks$";

async fn gitlab() -> (MockServer, GitLabProvider) {
    common::init_rustls();
    let server = MockServer::start().await;
    let provider = GitLabProvider::new(&server.uri(), "glpat-test").unwrap();
    (server, provider)
}

#[tokio::test]
async fn test_gitlab_project_lookup() {
    let (server, provider) = gitlab().await;
    Mock::given(method("GET"))
        .and(path_regex(PROJECT))
        .and(header("PRIVATE-TOKEN", "glpat-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "ssh_url_to_repo": "git@gitlab.example.com:team/svc.git"
        })))
        .mount(&server)
        .await;

    assert!(provider.project_exists("team/svc").await.unwrap());
    assert!(!provider.project_exists("team/other").await.unwrap());
    assert_eq!(
        provider.repository_ssh_url("/team/svc").await.unwrap(),
        "git@gitlab.example.com:team/svc.git"
    );
}

#[tokio::test]
async fn test_gitlab_create_project_in_namespace() {
    let (server, provider) = gitlab().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/namespaces/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects"))
        .and(body_partial_json(json!({
            "name": "svc",
            "path": "svc",
            "namespace_id": 7,
            "default_branch": "main",
            "initialize_with_readme": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 12 })))
        .expect(1)
        .mount(&server)
        .await;

    provider.create_project("/team/svc", "main").await.unwrap();
}

#[tokio::test]
async fn test_gitlab_webhook_lifecycle() {
    let (server, provider) = gitlab().await;
    Mock::given(method("POST"))
        .and(path_regex(HOOKS))
        .and(body_partial_json(json!({
            "url": "https://el-listener.example.com",
            "token": "s3cret",
            "push_events": true,
            "merge_requests_events": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "url": "https://el-listener.example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v4/projects/team(%2F|/)svc/hooks/42$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "url": "https://el-listener.example.com"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/v4/projects/team(%2F|/)svc/hooks/42$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider
        .create_webhook("team/svc", "https://el-listener.example.com", "s3cret")
        .await
        .unwrap();
    assert_eq!(id, 42);

    let hook = provider.get_webhook("team/svc", 42).await.unwrap();
    assert_eq!(hook.url, "https://el-listener.example.com");

    provider.delete_webhook("team/svc", 42).await.unwrap();
}

#[tokio::test]
async fn test_gitlab_lists_registered_webhooks() {
    let (server, provider) = gitlab().await;
    Mock::given(method("GET"))
        .and(path_regex(HOOKS))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "url": "https://ci.example.com/hook" },
            { "id": 42, "url": "https://el-listener.example.com" }
        ])))
        .mount(&server)
        .await;

    let hooks = provider.list_webhooks("/team/svc").await.unwrap();

    assert_eq!(hooks.len(), 2);
    assert_eq!(hooks[1].id, 42);
    assert_eq!(hooks[1].url, "https://el-listener.example.com");
}

#[tokio::test]
async fn test_gitlab_missing_webhook_is_not_found() {
    let (server, provider) = gitlab().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/hooks/7$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider.get_webhook("team/svc", 7).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_gitlab_server_error_is_surfaced() {
    let (server, provider) = gitlab().await;
    Mock::given(method("GET"))
        .and(path_regex(PROJECT))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = provider.project_exists("team/svc").await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Unexpected { status: 500, ref body } if body == "boom"
    ));
}

#[tokio::test]
async fn test_github_create_falls_back_to_user_repository() {
    common::init_rustls();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/octo/repos"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(header("Authorization", "Bearer ghp-test"))
        .and(body_partial_json(json!({ "name": "svc", "private": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GitHubProvider::new(&server.uri(), "ghp-test").unwrap();
    provider.create_project("octo/svc", "main").await.unwrap();
}

#[tokio::test]
async fn test_github_webhook_carries_secret() {
    common::init_rustls();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/svc/hooks"))
        .and(body_partial_json(json!({
            "name": "web",
            "config": { "url": "https://el-listener.example.com", "secret": "s3cret" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9,
            "config": { "url": "https://el-listener.example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GitHubProvider::new(&server.uri(), "ghp-test").unwrap();
    let id = provider
        .create_webhook("octo/svc", "https://el-listener.example.com", "s3cret")
        .await
        .unwrap();
    assert_eq!(id, 9);
}
