//! HTTP API integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use launchpad::app::options::{AuthOptions, RateLimitOptions, ServerOptions};
use launchpad::authn::authenticator::Authenticator;
use launchpad::server::serve::router;
use launchpad::server::state::ServerState;
use launchpad::storage::settings::UserSettings;
use launchpad::utils::sha256_hash;
use secrecy::SecretString;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::common::{deployment_options, service_with, FakeSourceControl, PROJECT_URL, REPO_URL};

const PASSWORD: &str = "correct horse";

fn authenticator() -> Arc<Authenticator> {
    let authenticator = Authenticator::new(&AuthOptions {
        jwt_secret: Some(SecretString::from("test-secret".to_string())),
        token_ttl: Duration::from_secs(300),
        users: vec![UserSettings {
            id: "1".to_string(),
            username: "admin".to_string(),
            password_sha256: sha256_hash(PASSWORD.as_bytes()),
            role: "admin".to_string(),
        }],
    })
    .unwrap();
    Arc::new(authenticator)
}

async fn app(dir: &TempDir) -> Router {
    app_with(dir, &ServerOptions::default()).await
}

async fn app_with(dir: &TempDir, server: &ServerOptions) -> Router {
    let options = deployment_options(dir, 3);
    let service = service_with(&options, FakeSourceControl::default(), Arc::default()).await;
    router(Arc::new(ServerState::new(Arc::new(service), authenticator())), server).unwrap()
}

async fn status_of(app: &Router, request: Request<Body>) -> StatusCode {
    app.clone().oneshot(request).await.unwrap().status()
}

fn from_client(mut request: Request<Body>, ip: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", ip.parse().unwrap());
    request
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "launchpad");
    assert!(body["endpoints"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_health_reports_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["platformCli"]["installed"], true);
    assert_eq!(body["data"]["maxConcurrentDeployments"], 3);
    assert_eq!(body["data"]["activeDeployments"], 0);
}

#[tokio::test]
async fn test_deploy_requires_token() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, post_json("/api/deploy", None, json!({"repoUrl": REPO_URL}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], 401);

    let (status, _) = send(&app, get("/api/deploy", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_validate_returns_user() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let token = login(&app).await;

    let (status, body) = send(&app, get("/api/auth/validate", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["user"]["username"], "admin");
}

#[tokio::test]
async fn test_invalid_deploy_request_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        post_json("/api/deploy", Some(&token), json!({"repoUrl": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(&app, post_json("/api/deploy", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deploy_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/deploy",
            Some(&token),
            json!({"repoUrl": REPO_URL, "branch": "main"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["status"], "initiated");
    let id = body["data"]["deployId"].as_str().unwrap().to_string();

    let mut record = Value::Null;
    for _ in 0..200 {
        let (status, body) = send(&app, get(&format!("/api/deploy/{id}"), Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        record = body["data"].clone();
        if record["status"] == "completed" || record["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(record["status"], "completed");
    assert_eq!(record["projectUrl"], PROJECT_URL);
    assert_eq!(record["deployId"], id.as_str());

    let (status, body) = send(&app, get("/api/deploy", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0].get("logs").is_none());

    let delete = Request::delete(format!("/api/deploy/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&format!("/api/deploy/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_cleanup_of_active_job_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let options = deployment_options(&dir, 3);
    let service = Arc::new(service_with(&options, FakeSourceControl::default(), Arc::default()).await);
    let id = service.admit_and_clone(REPO_URL, "main").await.unwrap();

    let app = router(
        Arc::new(ServerState::new(service, authenticator())),
        &ServerOptions::default(),
    )
    .unwrap();
    let token = login(&app).await;

    let delete = Request::delete(format!("/api/deploy/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_unknown_route_lists_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, get("/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["availableEndpoints"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_project_status() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let token = login(&app).await;

    let (status, body) = send(&app, get("/api/projects/prj_123", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["projectId"], "prj_123");
    assert!(body["data"]["info"].as_str().unwrap().contains("prj_123"));

    let (status, _) = send(&app, get("/api/projects/prj_123", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get("/api/projects/--help", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn test_body_limit_allows_large_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    // Larger than axum's built-in 2 MB default
    let password = "x".repeat(3 * 1024 * 1024);
    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = ServerOptions {
        max_body_bytes: 1024,
        ..Default::default()
    };
    let app = app_with(&dir, &server).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": "x".repeat(4096)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], 413);
}

#[tokio::test]
async fn test_rate_limit_applies_per_client_and_spares_health() {
    let dir = tempfile::tempdir().unwrap();
    let server = ServerOptions {
        rate_limit: Some(RateLimitOptions {
            requests: 2,
            window: Duration::from_secs(60),
        }),
        ..Default::default()
    };
    let app = app_with(&dir, &server).await;

    for _ in 0..2 {
        let status = status_of(&app, from_client(get("/api/auth/validate", None), "203.0.113.7")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let status = status_of(&app, from_client(get("/api/auth/validate", None), "203.0.113.7")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Health checks and the service info never count
    let status = status_of(&app, from_client(get("/api/health", None), "203.0.113.7")).await;
    assert_eq!(status, StatusCode::OK);
    let status = status_of(&app, from_client(get("/", None), "203.0.113.7")).await;
    assert_eq!(status, StatusCode::OK);

    // Other clients keep their own budget
    let status = status_of(&app, from_client(get("/api/auth/validate", None), "198.51.100.1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
