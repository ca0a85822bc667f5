//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::storage::settings::{RateLimitSettings, Settings, UserSettings};

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Deployment engine configuration
    pub deployments: DeploymentOptions,

    /// API authentication configuration
    pub auth: AuthOptions,
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
                max_body_bytes: settings.server.max_body_bytes,
                rate_limit: settings.server.rate_limit.as_ref().map(RateLimitOptions::from),
            },
            deployments: DeploymentOptions {
                workspace_root: settings.deployments.workspace_root.clone(),
                max_concurrent_deployments: settings.deployments.max_concurrent_deployments,
                deploy_timeout: Duration::from_secs(settings.deployments.deploy_timeout_secs),
                platform_api_token: settings
                    .deployments
                    .platform_api_token
                    .clone()
                    .filter(|token| !token.is_empty())
                    .map(SecretString::from),
                platform_binary: settings.deployments.platform_binary.clone(),
                platform_install_command: settings.deployments.platform_install_command.clone(),
                git_binary: settings.deployments.git_binary.clone(),
            },
            auth: AuthOptions {
                jwt_secret: settings
                    .auth
                    .jwt_secret
                    .clone()
                    .filter(|secret| !secret.is_empty())
                    .map(SecretString::from),
                token_ttl: Duration::from_secs(settings.auth.token_ttl_secs),
                users: settings.auth.users.clone(),
            },
        }
    }
}

/// Lifecycle options for the service
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted request body
    pub max_body_bytes: usize,

    /// Per-client request limit on the API routes
    pub rate_limit: Option<RateLimitOptions>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: 10 * 1024 * 1024,
            rate_limit: None,
        }
    }
}

/// Per-client request budget
#[derive(Debug, Clone)]
pub struct RateLimitOptions {
    /// Requests a client may burst
    pub requests: u32,

    /// Time for a spent budget to refill completely
    pub window: Duration,
}

impl RateLimitOptions {
    /// Interval after which one more request is allowed
    pub fn replenish_period(&self) -> Duration {
        self.window / self.requests.max(1)
    }
}

impl From<&RateLimitSettings> for RateLimitOptions {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            requests: settings.requests_per_window,
            window: Duration::from_secs(settings.window_secs),
        }
    }
}

/// Deployment engine options
#[derive(Debug, Clone)]
pub struct DeploymentOptions {
    /// Root directory for per-job workspaces
    pub workspace_root: PathBuf,

    /// Admission ceiling
    pub max_concurrent_deployments: usize,

    /// Wall-clock limit for the platform steps of one job
    pub deploy_timeout: Duration,

    /// Credential forwarded to the platform login when a request brings none
    pub platform_api_token: Option<SecretString>,

    /// Platform CLI executable
    pub platform_binary: String,

    /// Command installing the platform CLI when it is missing
    pub platform_install_command: Vec<String>,

    /// git executable
    pub git_binary: String,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./repos"),
            max_concurrent_deployments: 3,
            deploy_timeout: Duration::from_secs(15 * 60),
            platform_api_token: None,
            platform_binary: "railway".to_string(),
            platform_install_command: vec![
                "npm".to_string(),
                "install".to_string(),
                "-g".to_string(),
                "@railway/cli".to_string(),
            ],
            git_binary: "git".to_string(),
        }
    }
}

/// API authentication options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// HMAC secret for issued tokens, the server refuses to start without one
    pub jwt_secret: Option<SecretString>,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// Accounts allowed to log in
    pub users: Vec<UserSettings>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl: Duration::from_secs(24 * 60 * 60),
            users: Vec::new(),
        }
    }
}
