//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::LaunchpadError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployment engine configuration
    #[serde(default)]
    pub deployments: DeploymentSettings,

    /// API authentication configuration
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            deployments: DeploymentSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, LaunchpadError> {
        let settings = file.read_json::<Settings>().await.map_err(|e| {
            LaunchpadError::ConfigError(format!(
                "invalid settings file {}: {}",
                file.path().display(),
                e
            ))
        })?;
        Ok(settings.unwrap_or_default())
    }

    /// Overlay environment variables on top of the file settings
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.log_level = level,
                Err(e) => warn!("Ignoring LOG_LEVEL: {}", e),
            }
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Ignoring PORT={}: {}", port, e),
            }
        }
        if let Some(path) = lookup("REPO_PATH") {
            self.deployments.workspace_root = PathBuf::from(path);
        }
        if let Some(max) = lookup("MAX_CONCURRENT_DEPLOYS") {
            match max.parse() {
                Ok(max) => self.deployments.max_concurrent_deployments = max,
                Err(e) => warn!("Ignoring MAX_CONCURRENT_DEPLOYS={}: {}", max, e),
            }
        }
        if let Some(token) = lookup("RAILWAY_API_TOKEN") {
            self.deployments.platform_api_token = Some(token);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(ttl) = lookup("JWT_EXPIRATION_SECS") {
            match ttl.parse() {
                Ok(ttl) => self.auth.token_ttl_secs = ttl,
                Err(e) => warn!("Ignoring JWT_EXPIRATION_SECS={}: {}", ttl, e),
            }
        }
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), LaunchpadError> {
        if self.deployments.max_concurrent_deployments == 0 {
            return Err(LaunchpadError::ConfigError(
                "deployments.max_concurrent_deployments must be at least 1".to_string(),
            ));
        }
        if self.deployments.deploy_timeout_secs == 0 {
            return Err(LaunchpadError::ConfigError(
                "deployments.deploy_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.auth.token_ttl_secs == 0 || i64::try_from(self.auth.token_ttl_secs).is_err() {
            return Err(LaunchpadError::ConfigError(format!(
                "auth.token_ttl_secs must be between 1 and {}",
                i64::MAX
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(LaunchpadError::ConfigError(
                "server.max_body_bytes must be at least 1".to_string(),
            ));
        }
        if let Some(rate_limit) = &self.server.rate_limit {
            if rate_limit.requests_per_window == 0 || rate_limit.window_secs == 0 {
                return Err(LaunchpadError::ConfigError(
                    "server.rate_limit needs at least 1 request per window of at least 1 second"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Per-client request limit on the API routes, `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimitSettings>,
}

/// Per-client request budget over a sliding window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub requests_per_window: u32,
    pub window_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_rate_limit() -> Option<RateLimitSettings> {
    Some(RateLimitSettings {
        requests_per_window: 1000,
        window_secs: 15 * 60,
    })
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            rate_limit: default_rate_limit(),
        }
    }
}

/// Deployment engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Root directory for per-job workspaces
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Admission ceiling
    #[serde(default = "default_max_concurrent_deployments")]
    pub max_concurrent_deployments: usize,

    /// Wall-clock limit for the platform steps of one job
    #[serde(default = "default_deploy_timeout_secs")]
    pub deploy_timeout_secs: u64,

    /// Platform API token
    #[serde(default)]
    pub platform_api_token: Option<String>,

    #[serde(default = "default_platform_binary")]
    pub platform_binary: String,

    #[serde(default = "default_platform_install_command")]
    pub platform_install_command: Vec<String>,

    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("./repos")
}

fn default_max_concurrent_deployments() -> usize {
    3
}

fn default_deploy_timeout_secs() -> u64 {
    15 * 60
}

fn default_platform_binary() -> String {
    "railway".to_string()
}

fn default_platform_install_command() -> Vec<String> {
    ["npm", "install", "-g", "@railway/cli"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_concurrent_deployments: default_max_concurrent_deployments(),
            deploy_timeout_secs: default_deploy_timeout_secs(),
            platform_api_token: None,
            platform_binary: default_platform_binary(),
            platform_install_command: default_platform_install_command(),
            git_binary: default_git_binary(),
        }
    }
}

/// API authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for issued tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Accounts allowed to log in
    #[serde(default)]
    pub users: Vec<UserSettings>,
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            users: Vec::new(),
        }
    }
}

/// A login account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: String,
    pub username: String,
    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "admin".to_string()
}
