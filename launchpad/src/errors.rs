//! Error types for the Launchpad service

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use openapi_server::models::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Main error type for the Launchpad service
#[derive(Error, Debug)]
pub enum LaunchpadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Maximum number of concurrent deployments reached ({0}), try again later")]
    ResourceExhausted(usize),

    #[error("Deployment not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Deployment {0} is still in progress")]
    DeploymentActive(String),

    #[error("Workspace error: {0}")]
    WorkspaceError(String),

    #[error("Clone failed: {0}")]
    CloneFailed(String),

    #[error("Checkout failed: {0}")]
    CheckoutFailed(String),

    #[error("Platform CLI unavailable: {0}")]
    CliUnavailable(String),

    #[error("Platform CLI install failed: {0}")]
    CliInstallFailed(String),

    #[error("Deploy step '{step}' failed: {output}")]
    DeployStepFailed { step: String, output: String },

    #[error("Deployment timed out after {0:?}")]
    DeployTimedOut(Duration),

    #[error("Cleanup failed: {0}")]
    CleanupFailed(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LaunchpadError {
    pub fn step_failed(step: &str, output: impl Into<String>) -> Self {
        LaunchpadError::DeployStepFailed {
            step: step.to_string(),
            output: output.into(),
        }
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::IoError(_) => "io_error",
            Self::JsonError(_) => "json_error",
            Self::ValidationError(_) => "validation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unauthorized(_) => "unauthorized",
            Self::AuthError(_) => "auth_error",
            Self::ResourceExhausted(_) => "resource_exhausted",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::DeploymentActive(_) => "deployment_active",
            Self::WorkspaceError(_) => "workspace_error",
            Self::CloneFailed(_) => "clone_failed",
            Self::CheckoutFailed(_) => "checkout_failed",
            Self::CliUnavailable(_) => "cli_unavailable",
            Self::CliInstallFailed(_) => "cli_install_failed",
            Self::DeployStepFailed { .. } => "deploy_step_failed",
            Self::DeployTimedOut(_) => "deploy_timed_out",
            Self::CleanupFailed(_) => "cleanup_failed",
            Self::TokenError(_) => "token_error",
            Self::ConfigError(_) => "config_error",
            Self::ServerError(_) => "server_error",
            Self::ShutdownError(_) => "shutdown_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) | Self::AuthError(_) | Self::TokenError(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::DeploymentActive(_) => StatusCode::CONFLICT,
            Self::IoError(_)
            | Self::JsonError(_)
            | Self::WorkspaceError(_)
            | Self::CloneFailed(_)
            | Self::CheckoutFailed(_)
            | Self::CliUnavailable(_)
            | Self::CliInstallFailed(_)
            | Self::DeployStepFailed { .. }
            | Self::DeployTimedOut(_)
            | Self::CleanupFailed(_)
            | Self::ConfigError(_)
            | Self::ServerError(_)
            | Self::ShutdownError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for LaunchpadError {
    fn from(err: anyhow::Error) -> Self {
        LaunchpadError::Internal(err.to_string())
    }
}

impl IntoResponse for LaunchpadError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            // Process internals stay in the server log
            Self::IoError(_)
            | Self::JsonError(_)
            | Self::ConfigError(_)
            | Self::ServerError(_)
            | Self::ShutdownError(_)
            | Self::Internal(_) => {
                error!("Internal error while handling request: {}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            status: "error".to_string(),
            code: status.as_u16(),
            message,
            error_type: Some(self.error_type().to_string()),
        };

        (status, Json(body)).into_response()
    }
}
