//! REST client tests against a mock HTTP server

use base64::Engine;
use poseidon_deploy::config::{GitHubConfig, RenderConfig, VercelConfig};
use poseidon_deploy::detect::resolve_root_directories;
use poseidon_deploy::github::{EntryKind, GitHubClient, RepositorySource};
use poseidon_deploy::providers::{HostingProvider, RenderClient, VercelClient};
use poseidon_deploy::shared::{DeployParams, DeploymentRef, EnvVar, Framework, Project};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vercel(server: &MockServer, team_id: Option<&str>) -> VercelClient {
    VercelClient::new(VercelConfig {
        token: "vercel-token".to_string(),
        team_id: team_id.map(String::from),
        api_url: server.uri(),
    })
}

fn render(server: &MockServer) -> RenderClient {
    RenderClient::new(RenderConfig {
        api_key: "render-key".to_string(),
        owner_id: Some("own_1".to_string()),
        plan: "starter".to_string(),
        region: "oregon".to_string(),
        api_url: server.uri(),
    })
}

fn params() -> DeployParams {
    DeployParams {
        repository: "octo/shop".to_string(),
        project_name: "shop".to_string(),
        branch: "main".to_string(),
        root_directory: Some("apps/web".to_string()),
        framework: Some(Framework::Nextjs),
        build_command: None,
        start_command: None,
        install_command: None,
        output_directory: None,
        environment_variables: vec![
            EnvVar::new("API_URL", "https://api.example.com"),
            EnvVar::new("TOKEN", "secret"),
        ],
        auto_detect_framework: true,
    }
}

// ============================================================================
// Vercel
// ============================================================================

#[tokio::test]
async fn test_vercel_missing_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v9/projects/shop"))
        .and(query_param("teamId", "team_1"))
        .and(header("authorization", "Bearer vercel-token"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "not_found"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let project = vercel(&server, Some("team_1"))
        .get_project("shop")
        .await
        .unwrap();

    assert!(project.is_none());
}

#[tokio::test]
async fn test_vercel_deploy_from_github_creates_project() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v9/projects/shop"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v10/projects"))
        .and(body_partial_json(json!({
            "name": "shop",
            "gitRepository": {"type": "github", "repo": "octo/shop"},
            "framework": "nextjs",
            "rootDirectory": "apps/web"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "prj_1",
            "name": "shop"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v9/projects/prj_1/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "envs": [
                {"id": "env_old", "key": "API_URL", "value": "stale", "target": "preview"},
                {"id": "env_other", "key": "OTHER", "value": "x", "target": ["production"]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v9/projects/prj_1/env/env_old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v10/projects/prj_1/env"))
        .and(body_partial_json(json!({
            "type": "encrypted",
            "target": ["production", "preview", "development"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v13/deployments"))
        .and(body_partial_json(json!({
            "project": "prj_1",
            "target": "production",
            "gitSource": {"type": "github", "org": "octo", "repo": "shop", "ref": "main"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dpl_1",
            "url": "shop-abc123.vercel.app",
            "readyState": "QUEUED",
            "inspectorUrl": "https://vercel.com/octo/shop/dpl_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = vercel(&server, None)
        .deploy_from_github(&params())
        .await
        .unwrap();

    assert_eq!(result.project_id, "prj_1");
    assert_eq!(result.deployment_id, "dpl_1");
    assert_eq!(result.url.as_deref(), Some("https://shop-abc123.vercel.app"));
    assert_eq!(result.status, "QUEUED");
    assert_eq!(
        result.dashboard_url.as_deref(),
        Some("https://vercel.com/octo/shop/dpl_1")
    );
}

#[tokio::test]
async fn test_vercel_update_clears_unset_settings() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v9/projects/prj_1"))
        .and(body_partial_json(json!({
            "framework": null,
            "rootDirectory": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let params = DeployParams {
        framework: None,
        root_directory: None,
        ..params()
    };

    vercel(&server, None)
        .update_project_settings("prj_1", &params)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vercel_api_error_includes_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v10/projects"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid rootDirectory"))
        .mount(&server)
        .await;

    let err = vercel(&server, None)
        .create_project(&params())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("Vercel API error 400"));
    assert!(message.contains("invalid rootDirectory"));
}

#[tokio::test]
async fn test_vercel_get_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v13/deployments/dpl_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dpl_1",
            "url": "shop-abc123.vercel.app",
            "readyState": "ERROR",
            "projectId": "prj_1",
            "createdAt": 1700000000000i64,
            "errorCode": "BUILD_FAILED",
            "errorMessage": "Command \"npm run build\" exited with 1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v13/deployments/dpl_gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = vercel(&server, None);
    let deployment = client
        .get_deployment(&DeploymentRef::new("dpl_1"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(deployment.status, "ERROR");
    assert!(client.is_terminal(&deployment.status));
    assert_eq!(deployment.error_code.as_deref(), Some("BUILD_FAILED"));
    assert_eq!(
        deployment.created_at.map(|t| t.timestamp()),
        Some(1_700_000_000)
    );

    assert!(
        client
            .get_deployment(&DeploymentRef::new("dpl_gone"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_vercel_deployment_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/deployments/dpl_1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"type": "stdout", "text": "Cloning github.com/octo/shop"},
            {"type": "stdout", "payload": {"text": "Running \"npm run build\""}},
            {"type": "delimiter"}
        ])))
        .mount(&server)
        .await;

    let lines = vercel(&server, None)
        .get_deployment_events(&DeploymentRef::new("dpl_1"))
        .await
        .unwrap();

    assert_eq!(
        lines,
        vec!["Cloning github.com/octo/shop", "Running \"npm run build\""]
    );
}

// ============================================================================
// Render
// ============================================================================

#[tokio::test]
async fn test_render_get_project_matches_exact_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .and(query_param("name", "shop"))
        .and(header("authorization", "Bearer render-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"service": {"id": "srv_2", "name": "shop-staging"}},
            {"service": {
                "id": "srv_1",
                "name": "shop",
                "serviceDetails": {"url": "shop.onrender.com"}
            }}
        ])))
        .mount(&server)
        .await;

    let project = render(&server).get_project("shop").await.unwrap().unwrap();

    assert_eq!(project.id, "srv_1");
    assert_eq!(project.url.as_deref(), Some("https://shop.onrender.com"));
}

#[tokio::test]
async fn test_render_create_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services"))
        .and(body_partial_json(json!({
            "type": "web_service",
            "name": "shop",
            "ownerId": "own_1",
            "repo": "https://github.com/octo/shop",
            "rootDir": "apps/web",
            "serviceDetails": {"env": "node", "plan": "starter", "region": "oregon"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "service": {"id": "srv_1", "name": "shop"},
            "deployId": "dep_0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let project = render(&server).create_project(&params()).await.unwrap();

    assert_eq!(project.id, "srv_1");
}

#[tokio::test]
async fn test_render_owner_lookup_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/owners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"owner": {"id": "own_auto", "name": "octo"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services"))
        .and(body_partial_json(json!({"ownerId": "own_auto"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "service": {"id": "srv_1", "name": "shop"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RenderClient::new(RenderConfig {
        api_key: "render-key".to_string(),
        owner_id: None,
        plan: "starter".to_string(),
        region: "oregon".to_string(),
        api_url: server.uri(),
    });

    client.create_project(&params()).await.unwrap();
}

#[tokio::test]
async fn test_render_update_resets_root_dir() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/services/srv_1"))
        .and(body_partial_json(json!({"rootDir": "", "branch": "main"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let params = DeployParams {
        root_directory: None,
        ..params()
    };

    render(&server)
        .update_project_settings("srv_1", &params)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_render_env_vars_keyed_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv_1/env-vars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"envVar": {"key": "API_URL", "value": "stale"}},
            {"envVar": {"key": "OTHER", "value": "x"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/services/srv_1/env-vars/API_URL"))
        .and(body_partial_json(json!({"value": "fresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = render(&server);
    let vars = client.list_env_vars("srv_1").await.unwrap();
    assert_eq!(vars[0].id, "API_URL");
    assert_eq!(vars[0].key, "API_URL");

    client
        .create_env_var("srv_1", &EnvVar::new("API_URL", "fresh"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_render_trigger_and_fetch_deploy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/srv_1/deploys"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "dep_1",
            "status": "created",
            "createdAt": "2024-05-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/srv_1/deploys/dep_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dep_1",
            "status": "update_failed",
            "createdAt": "2024-05-01T12:00:00Z",
            "finishedAt": "2024-05-01T12:03:00Z"
        })))
        .mount(&server)
        .await;

    let client = render(&server);
    let project = Project {
        id: "srv_1".to_string(),
        name: "shop".to_string(),
        url: Some("https://shop.onrender.com".to_string()),
    };

    let triggered = client.trigger_deployment(&project, &params()).await.unwrap();
    assert_eq!(triggered.id, "dep_1");
    assert_eq!(triggered.url.as_deref(), Some("https://shop.onrender.com"));
    assert_eq!(
        triggered.inspector_url.as_deref(),
        Some("https://dashboard.render.com/web/srv_1/deploys/dep_1")
    );

    let fetched = client
        .get_deployment(&DeploymentRef::with_service("dep_1", "srv_1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.status, "update_failed");
    assert!(client.is_terminal(&fetched.status));
    assert!(fetched.error_message.is_some());
}

#[tokio::test]
async fn test_render_deploy_lookup_requires_service_id() {
    let server = MockServer::start().await;

    let err = render(&server)
        .get_deployment(&DeploymentRef::new("dep_1"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("service id"));
}

#[tokio::test]
async fn test_render_events_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv_1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"event": {"timestamp": "2024-05-01T12:03:00Z", "type": "deploy_ended"}},
            {"event": {"timestamp": "2024-05-01T12:00:00Z", "type": "deploy_started"}}
        ])))
        .mount(&server)
        .await;

    let lines = render(&server)
        .get_deployment_events(&DeploymentRef::with_service("dep_1", "srv_1"))
        .await
        .unwrap();

    assert_eq!(
        lines,
        vec![
            "2024-05-01T12:00:00Z deploy_started",
            "2024-05-01T12:03:00Z deploy_ended"
        ]
    );
}

// ============================================================================
// GitHub
// ============================================================================

fn github(server: &MockServer) -> GitHubClient {
    GitHubClient::new(GitHubConfig {
        token: Some("gh-token".to_string()),
        username: None,
        api_url: server.uri(),
    })
}

#[tokio::test]
async fn test_github_file_content_is_decoded() {
    let server = MockServer::start().await;
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(r#"{"dependencies":{"next":"14"}}"#);
    // GitHub wraps base64 content at 60 columns
    let wrapped = format!("{}\n{}", &encoded[..20], &encoded[20..]);

    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/apps/web/package.json"))
        .and(header("authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": wrapped,
            "encoding": "base64"
        })))
        .mount(&server)
        .await;

    let contents = github(&server)
        .get_file_content("octo", "shop", "apps/web/package.json")
        .await
        .unwrap();

    assert_eq!(contents, r#"{"dependencies":{"next":"14"}}"#);
}

#[tokio::test]
async fn test_github_missing_file_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/package.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = github(&server)
        .get_file_content("octo", "shop", "package.json")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("GitHub API error 404"));
}

#[tokio::test]
async fn test_github_repo_structure_respects_depth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "package.json", "path": "package.json", "type": "file"},
            {"name": "apps", "path": "apps", "type": "dir"},
            {"name": "vendor", "path": "vendor", "type": "submodule"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "web", "path": "apps/web", "type": "dir"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/apps/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let tree = github(&server)
        .get_repo_structure("octo", "shop", "", 2)
        .await
        .unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].kind, EntryKind::File);
    assert_eq!(tree[1].name, "apps");
    assert_eq!(tree[1].children.len(), 1);
    assert_eq!(tree[1].children[0].path, "apps/web");
    assert!(tree[1].children[0].children.is_empty());
}

#[tokio::test]
async fn test_github_walk_skips_vendored_dirs_and_survives_listing_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "package.json", "path": "package.json", "type": "file"},
            {"name": ".github", "path": ".github", "type": "dir"},
            {"name": "apps", "path": "apps", "type": "dir"},
            {"name": "docs", "path": "docs", "type": "dir"},
            {"name": "node_modules", "path": "node_modules", "type": "dir"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "web", "path": "apps/web", "type": "dir"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/apps/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "package.json", "path": "apps/web/package.json", "type": "file"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/docs"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API rate limit exceeded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/node_modules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/shop/contents/.github"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = github(&server);
    let tree = client
        .get_repo_structure("octo", "shop", "", 6)
        .await
        .unwrap();

    let names: Vec<_> = tree.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["package.json", "apps", "docs"]);
    assert!(tree[2].children.is_empty());

    assert_eq!(
        resolve_root_directories(&client, "octo", "shop", 6).await,
        vec!["apps/web", ""]
    );
}
