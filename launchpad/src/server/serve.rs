//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use governor::middleware::NoOpMiddleware;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::{RateLimitOptions, ServerOptions};
use crate::errors::LaunchpadError;
use crate::server::handlers::{
    cleanup_deployment_handler, get_deployment_handler, health_handler, list_deployments_handler,
    list_projects_handler, login_handler, not_found_handler, project_status_handler, root_handler,
    start_deploy_handler, validate_handler,
};
use crate::server::state::ServerState;

type RateLimitLayer = GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware, Body>;

/// Per-client limiter keyed on the forwarding headers, then the peer address
fn rate_limit_layer(options: &RateLimitOptions) -> Result<RateLimitLayer, LaunchpadError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .period(options.replenish_period())
        .burst_size(options.requests)
        .finish()
        .ok_or_else(|| {
            LaunchpadError::ConfigError(format!("invalid rate limit: {:?}", options))
        })?;

    Ok(GovernorLayer::new(config))
}

/// Build the application router.
///
/// The service info and health routes stay outside the rate limit.
pub fn router(state: Arc<ServerState>, options: &ServerOptions) -> Result<Router, LaunchpadError> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = Router::new()
        // Auth
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/validate", get(validate_handler))
        // Deployments
        .route(
            "/api/deploy",
            post(start_deploy_handler).get(list_deployments_handler),
        )
        .route(
            "/api/deploy/{id}",
            get(get_deployment_handler).delete(cleanup_deployment_handler),
        )
        // Platform projects
        .route("/api/projects", get(list_projects_handler))
        .route("/api/projects/{project_id}", get(project_status_handler));

    let api = match &options.rate_limit {
        Some(rate_limit) => {
            info!(
                "Rate limiting API routes to {} requests per {:?}",
                rate_limit.requests, rate_limit.window
            );
            api.layer(rate_limit_layer(rate_limit)?)
        }
        None => api,
    };

    Ok(Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .merge(api)
        .fallback(not_found_handler)
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), LaunchpadError>>, LaunchpadError> {
    let app = router(state, options)?;

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LaunchpadError::ServerError(format!("failed to bind {}: {}", addr, e)))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| LaunchpadError::ServerError(e.to_string()))
    });

    Ok(handle)
}
