//! Platform CLI adapter
//!
//! The only place that drives the publishing tool. Every verb runs the CLI as a
//! subprocess and returns its trimmed stdout.

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::deploy::command::run_command;
use crate::errors::LaunchpadError;

pub const STEP_INIT: &str = "init";
pub const STEP_PUBLISH: &str = "publish";
pub const STEP_RESOLVE_URL: &str = "resolve-url";
pub const STEP_LIST_PROJECTS: &str = "list-projects";
pub const STEP_PROJECT_STATUS: &str = "project-status";

/// External publishing tool
#[async_trait]
pub trait PlatformCli: Send + Sync {
    /// Installed tool version, without attempting an install
    async fn tool_version(&self) -> Result<String, LaunchpadError>;

    /// Return the tool version, installing the tool once if it is missing
    async fn ensure_tool_available(&self) -> Result<String, LaunchpadError>;

    /// Log the shared CLI session in with an API token
    async fn authenticate(&self, credential: &SecretString) -> Result<String, LaunchpadError>;

    /// Create and link a project for the workspace
    async fn initialize_project(&self, workspace: &Path) -> Result<String, LaunchpadError>;

    /// Upload and deploy the workspace
    async fn publish(&self, workspace: &Path) -> Result<String, LaunchpadError>;

    /// Public URL of the linked project
    async fn resolve_public_url(&self, workspace: &Path) -> Result<String, LaunchpadError>;

    /// Projects visible to the current session
    async fn list_projects(&self) -> Result<Vec<String>, LaunchpadError>;

    /// Select a project by id and report its status
    async fn project_status(&self, project_id: &str) -> Result<String, LaunchpadError>;
}

/// Railway CLI
pub struct RailwayCli {
    binary: String,
    install_command: Vec<String>,
    install_attempted: Mutex<bool>,
    selection: Mutex<()>,
}

impl RailwayCli {
    pub fn new(binary: impl Into<String>, install_command: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            install_command,
            install_attempted: Mutex::new(false),
            selection: Mutex::new(()),
        }
    }

    async fn install(&self) -> Result<(), LaunchpadError> {
        let (program, args) = self
            .install_command
            .split_first()
            .ok_or_else(|| LaunchpadError::CliInstallFailed("no install command configured".to_string()))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Installing platform CLI: {}", self.install_command.join(" "));
        let output = run_command(program, &args, None)
            .await
            .map_err(|e| LaunchpadError::CliInstallFailed(format!("failed to run {}: {}", program, e)))?;

        if !output.success {
            return Err(LaunchpadError::CliInstallFailed(output.failure_text()));
        }
        Ok(())
    }

    async fn run_step(&self, step: &str, args: &[&str], workspace: Option<&Path>) -> Result<String, LaunchpadError> {
        let output = run_command(&self.binary, args, workspace)
            .await
            .map_err(|e| LaunchpadError::step_failed(step, format!("failed to run {}: {}", self.binary, e)))?;

        if !output.success {
            return Err(LaunchpadError::step_failed(step, output.failure_text()));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl PlatformCli for RailwayCli {
    async fn tool_version(&self) -> Result<String, LaunchpadError> {
        let output = run_command(&self.binary, &["version"], None)
            .await
            .map_err(|e| LaunchpadError::CliUnavailable(format!("{}: {}", self.binary, e)))?;

        if !output.success {
            return Err(LaunchpadError::CliUnavailable(output.failure_text()));
        }
        Ok(output.stdout)
    }

    async fn ensure_tool_available(&self) -> Result<String, LaunchpadError> {
        let missing = match self.tool_version().await {
            Ok(version) => return Ok(version),
            Err(e) => e,
        };

        let mut attempted = self.install_attempted.lock().await;

        // Another job may have installed it while we waited for the lock
        if let Ok(version) = self.tool_version().await {
            return Ok(version);
        }
        if *attempted {
            return Err(missing);
        }
        *attempted = true;

        warn!("Platform CLI not found ({}), attempting install...", missing);
        if let Err(e) = self.install().await {
            error!("Failed to install platform CLI: {}", e);
            return Err(e);
        }
        info!("Platform CLI installed");

        self.tool_version().await
    }

    async fn authenticate(&self, credential: &SecretString) -> Result<String, LaunchpadError> {
        let output = run_command(
            &self.binary,
            &["login", "--token", credential.expose_secret()],
            None,
        )
        .await
        .map_err(|e| LaunchpadError::AuthError(format!("failed to run {} login: {}", self.binary, e)))?;

        if !output.success {
            return Err(LaunchpadError::AuthError(format!(
                "platform login rejected: {}",
                output.failure_text()
            )));
        }
        info!("Platform login succeeded");
        Ok(output.stdout)
    }

    async fn initialize_project(&self, workspace: &Path) -> Result<String, LaunchpadError> {
        self.run_step(STEP_INIT, &["init", "--yes"], Some(workspace)).await
    }

    async fn publish(&self, workspace: &Path) -> Result<String, LaunchpadError> {
        self.run_step(STEP_PUBLISH, &["up", "--detach"], Some(workspace)).await
    }

    async fn resolve_public_url(&self, workspace: &Path) -> Result<String, LaunchpadError> {
        self.run_step(STEP_RESOLVE_URL, &["domain"], Some(workspace)).await
    }

    async fn list_projects(&self) -> Result<Vec<String>, LaunchpadError> {
        let stdout = self.run_step(STEP_LIST_PROJECTS, &["list"], None).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn project_status(&self, project_id: &str) -> Result<String, LaunchpadError> {
        // Selecting a project changes what `status` reports
        let _selection = self.selection.lock().await;
        self.run_step(STEP_PROJECT_STATUS, &["project", project_id], None)
            .await?;
        self.run_step(STEP_PROJECT_STATUS, &["status"], None).await
    }
}
