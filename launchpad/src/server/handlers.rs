//! HTTP request handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use openapi_server::models::{
    ApiResponse, DeployAccepted, DeployRequest, HealthResponse, LoginRequest, MemoryHealth,
    PlatformCliHealth, ProjectInfo, ServiceInfo, ValidateResponse,
};
use secrecy::SecretString;
use tracing::{info, warn};
use url::Url;

use crate::authn::authenticator::user_info;
use crate::errors::LaunchpadError;
use crate::server::auth::RequireAuth;
use crate::server::state::ServerState;
use crate::telemetry::collect_metrics;
use crate::utils::version_info;

const SERVICE_NAME: &str = "launchpad";
const DEFAULT_BRANCH: &str = "main";
const HEALTH_CLI_TIMEOUT: Duration = Duration::from_secs(5);
const URL_SCHEMES: &[&str] = &["http", "https", "ssh", "git", "file"];

pub const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /api/health",
    "POST /api/auth/login",
    "GET /api/auth/validate",
    "POST /api/deploy",
    "GET /api/deploy",
    "GET /api/deploy/{id}",
    "DELETE /api/deploy/{id}",
    "GET /api/projects",
    "GET /api/projects/{projectId}",
];

fn endpoints() -> Vec<String> {
    ENDPOINTS.iter().map(|e| e.to_string()).collect()
}

/// Service info handler
pub async fn root_handler() -> impl IntoResponse {
    Json(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        version: version_info().version,
        status: "running".to_string(),
        endpoints: endpoints(),
    })
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let service = &state.service;

    let platform_cli = match tokio::time::timeout(
        HEALTH_CLI_TIMEOUT,
        service.platform().tool_version(),
    )
    .await
    {
        Ok(Ok(version)) => PlatformCliHealth {
            installed: true,
            version: Some(version),
            error: None,
        },
        Ok(Err(e)) => PlatformCliHealth {
            installed: false,
            version: None,
            error: Some(e.to_string()),
        },
        Err(_) => PlatformCliHealth {
            installed: false,
            version: None,
            error: Some("version check timed out".to_string()),
        },
    };

    let workspace_ok = tokio::fs::metadata(service.workspace_root())
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    let status = if platform_cli.installed && workspace_ok {
        "healthy"
    } else {
        "degraded"
    };

    let metrics = collect_metrics();
    Json(ApiResponse::data(HealthResponse {
        service: SERVICE_NAME.to_string(),
        version: version_info().version,
        status: status.to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        hostname: metrics.hostname,
        memory: MemoryHealth {
            used: metrics.memory_used_mb,
            total: metrics.memory_total_mb,
        },
        platform_cli,
        workspace_root: service.workspace_root().display().to_string(),
        active_deployments: service.active_count(),
        max_concurrent_deployments: service.capacity(),
    }))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, LaunchpadError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(LaunchpadError::PayloadTooLarge(e.body_text()))
        }
        Err(e) => Err(LaunchpadError::ValidationError(e.body_text())),
    }
}

/// Login handler
pub async fn login_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, LaunchpadError> {
    let request = json_body(body)?;
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(LaunchpadError::ValidationError(
            "username and password are required".to_string(),
        ));
    }

    let response = state
        .authenticator
        .login(request.username.trim(), &request.password)?;
    Ok(Json(ApiResponse::data(response).with_message("Login successful")))
}

/// Token validation handler
pub async fn validate_handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
    Json(ApiResponse::data(ValidateResponse {
        valid: true,
        user: user_info(&claims),
        expires_at: claims.expires_at(),
    }))
}

/// Validated deployment request
#[derive(Debug)]
pub struct DeployParams {
    pub repo_url: String,
    pub branch: String,
    pub credential: Option<SecretString>,
}

/// Check a deployment request and apply defaults
pub fn validate_deploy_request(request: DeployRequest) -> Result<DeployParams, LaunchpadError> {
    let repo_url = request.repo_url.trim();
    if repo_url.is_empty() {
        return Err(LaunchpadError::ValidationError(
            "repoUrl is required".to_string(),
        ));
    }
    if !is_repository_url(repo_url) {
        return Err(LaunchpadError::ValidationError(format!(
            "repoUrl is not a valid repository URL: {}",
            repo_url
        )));
    }

    let branch = match request.branch.as_deref().map(str::trim) {
        None => DEFAULT_BRANCH,
        Some("") => {
            return Err(LaunchpadError::ValidationError(
                "branch must not be blank".to_string(),
            ))
        }
        Some(branch) if branch.starts_with('-') => {
            return Err(LaunchpadError::ValidationError(format!(
                "invalid branch name: {}",
                branch
            )))
        }
        Some(branch) => branch,
    };

    let credential = request
        .token
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .map(SecretString::from);

    Ok(DeployParams {
        repo_url: repo_url.to_string(),
        branch: branch.to_string(),
        credential,
    })
}

fn is_repository_url(raw: &str) -> bool {
    if let Ok(url) = Url::parse(raw) {
        return URL_SCHEMES.contains(&url.scheme());
    }

    // scp-style: git@host:owner/repo.git
    match raw.split_once(':') {
        Some((user_host, path)) => {
            let host = user_host.rsplit('@').next().unwrap_or_default();
            !host.is_empty()
                && !path.is_empty()
                && !user_host.contains('/')
                && !user_host.chars().any(char::is_whitespace)
                && !path.starts_with("//")
        }
        None => false,
    }
}

/// Start deployment handler
pub async fn start_deploy_handler(
    State(state): State<Arc<ServerState>>,
    RequireAuth(claims): RequireAuth,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<impl IntoResponse, LaunchpadError> {
    let request = json_body(body)?;
    let params = validate_deploy_request(request)?;

    info!(
        "Deployment requested by {}: {} (branch: {})",
        claims.username, params.repo_url, params.branch
    );
    let deploy_id = state
        .service
        .admit_and_clone(&params.repo_url, &params.branch)
        .await?;
    state.service.spawn_deploy(deploy_id.clone(), params.credential);

    Ok((
        StatusCode::ACCEPTED,
        Json(
            ApiResponse::data(DeployAccepted {
                deploy_id,
                status: "initiated".to_string(),
            })
            .with_message("Deployment initiated"),
        ),
    ))
}

/// List deployments handler
pub async fn list_deployments_handler(
    State(state): State<Arc<ServerState>>,
    _auth: RequireAuth,
) -> impl IntoResponse {
    let mut deployments = state.service.list_all();
    deployments.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    Json(ApiResponse::data(deployments))
}

/// Deployment status handler
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    _auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, LaunchpadError> {
    let record = state.service.get_status(&id)?;
    Ok(Json(ApiResponse::data(record)))
}

/// Deployment cleanup handler
pub async fn cleanup_deployment_handler(
    State(state): State<Arc<ServerState>>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, LaunchpadError> {
    state.service.cleanup(&id).await?;
    info!("Deployment {} cleaned up by {}", id, claims.username);
    Ok(Json(ApiResponse::message(format!(
        "Deployment {} cleaned up",
        id
    ))))
}

/// Platform projects handler
pub async fn list_projects_handler(
    State(state): State<Arc<ServerState>>,
    _auth: RequireAuth,
) -> Result<impl IntoResponse, LaunchpadError> {
    let projects = state.service.platform().list_projects().await?;
    Ok(Json(ApiResponse::data(projects)))
}

/// Project ids are passed to the CLI as a positional argument
pub fn validate_project_id(raw: &str) -> Result<&str, LaunchpadError> {
    let project_id = raw.trim();
    if project_id.is_empty() {
        return Err(LaunchpadError::ValidationError(
            "projectId is required".to_string(),
        ));
    }
    if project_id.starts_with('-') || project_id.chars().any(char::is_whitespace) {
        return Err(LaunchpadError::ValidationError(format!(
            "invalid projectId: {}",
            project_id
        )));
    }
    Ok(project_id)
}

/// Platform project status handler
pub async fn project_status_handler(
    State(state): State<Arc<ServerState>>,
    _auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, LaunchpadError> {
    let project_id = validate_project_id(&project_id)?;
    let info = state
        .service
        .platform()
        .project_status(project_id)
        .await?;
    Ok(Json(ApiResponse::data(ProjectInfo {
        project_id: project_id.to_string(),
        info,
    })))
}

/// Fallback for unknown routes
pub async fn not_found_handler(uri: axum::http::Uri) -> impl IntoResponse {
    warn!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "status": "error",
            "code": StatusCode::NOT_FOUND.as_u16(),
            "message": format!("Route {} not found", uri.path()),
            "availableEndpoints": ENDPOINTS,
        })),
    )
}
