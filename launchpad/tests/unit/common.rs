//! Fakes shared by the integration tests

use std::path::Path;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use launchpad::app::options::DeploymentOptions;
use launchpad::deploy::git::SourceControl;
use launchpad::deploy::platform::{
    PlatformCli, STEP_INIT, STEP_PROJECT_STATUS, STEP_PUBLISH, STEP_RESOLVE_URL,
};
use launchpad::deploy::service::DeploymentService;
use launchpad::errors::LaunchpadError;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;

pub const REPO_URL: &str = "https://github.com/acme/app.git";
pub const PROJECT_URL: &str = "https://app-production.up.railway.app";

const STEP_DELAY: Duration = Duration::from_millis(5);

/// Source control writing a placeholder file instead of cloning
#[derive(Default)]
pub struct FakeSourceControl {
    pub fail_clone: bool,
    pub fail_checkout: bool,
    pub delay: Duration,
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn clone_repository(&self, repo_url: &str, target_dir: &Path) -> Result<(), LaunchpadError> {
        tokio::time::sleep(self.delay).await;
        tokio::fs::write(target_dir.join("README.md"), repo_url).await?;
        if self.fail_clone {
            return Err(LaunchpadError::CloneFailed(format!(
                "repository not found: {}",
                repo_url
            )));
        }
        Ok(())
    }

    async fn checkout(&self, _repo_dir: &Path, branch: &str) -> Result<(), LaunchpadError> {
        if self.fail_checkout {
            return Err(LaunchpadError::CheckoutFailed(format!(
                "pathspec '{}' did not match",
                branch
            )));
        }
        Ok(())
    }
}

/// Platform recording its calls, with an optional failing or hanging step.
///
/// A session opens at login and closes when init returns; `max_in_session`
/// records the most sessions ever open at once.
pub struct FakePlatform {
    pub fail_step: Option<&'static str>,
    pub hang_step: Option<&'static str>,
    pub project_url: String,
    pub session_delay: Duration,
    pub logins: Mutex<Vec<String>>,
    pub publishes: AtomicUsize,
    pub in_session: AtomicIsize,
    pub max_in_session: AtomicIsize,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            fail_step: None,
            hang_step: None,
            project_url: PROJECT_URL.to_string(),
            session_delay: Duration::ZERO,
            logins: Mutex::new(Vec::new()),
            publishes: AtomicUsize::new(0),
            in_session: AtomicIsize::new(0),
            max_in_session: AtomicIsize::new(0),
        }
    }
}

impl FakePlatform {
    pub fn failing(step: &'static str) -> Self {
        Self {
            fail_step: Some(step),
            ..Default::default()
        }
    }

    pub fn hanging(step: &'static str) -> Self {
        Self {
            hang_step: Some(step),
            ..Default::default()
        }
    }

    pub fn slow_sessions(session_delay: Duration) -> Self {
        Self {
            session_delay,
            ..Default::default()
        }
    }

    async fn step(&self, step: &str, output: &str) -> Result<String, LaunchpadError> {
        tokio::time::sleep(STEP_DELAY).await;
        if self.hang_step == Some(step) {
            std::future::pending::<()>().await;
        }
        if self.fail_step == Some(step) {
            return Err(LaunchpadError::step_failed(step, format!("{} exploded", step)));
        }
        Ok(output.to_string())
    }
}

#[async_trait]
impl PlatformCli for FakePlatform {
    async fn tool_version(&self) -> Result<String, LaunchpadError> {
        Ok("railway 3.20.0".to_string())
    }

    async fn ensure_tool_available(&self) -> Result<String, LaunchpadError> {
        self.tool_version().await
    }

    async fn authenticate(&self, credential: &SecretString) -> Result<String, LaunchpadError> {
        self.logins
            .lock()
            .unwrap()
            .push(credential.expose_secret().to_string());
        let open = self.in_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_session.fetch_max(open, Ordering::SeqCst);
        tokio::time::sleep(self.session_delay).await;
        Ok("Logged in".to_string())
    }

    async fn initialize_project(&self, _workspace: &Path) -> Result<String, LaunchpadError> {
        tokio::time::sleep(self.session_delay).await;
        let result = self.step(STEP_INIT, "Created project app").await;
        self.in_session.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn publish(&self, _workspace: &Path) -> Result<String, LaunchpadError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.step(STEP_PUBLISH, "Deploy complete").await
    }

    async fn resolve_public_url(&self, _workspace: &Path) -> Result<String, LaunchpadError> {
        let url = self.project_url.clone();
        self.step(STEP_RESOLVE_URL, &url).await
    }

    async fn list_projects(&self) -> Result<Vec<String>, LaunchpadError> {
        Ok(vec!["app".to_string(), "api".to_string()])
    }

    async fn project_status(&self, project_id: &str) -> Result<String, LaunchpadError> {
        let status = format!("Project: {}\nEnvironment: production", project_id);
        self.step(STEP_PROJECT_STATUS, &status).await
    }
}

pub fn deployment_options(workspace: &TempDir, capacity: usize) -> DeploymentOptions {
    DeploymentOptions {
        workspace_root: workspace.path().join("repos"),
        max_concurrent_deployments: capacity,
        deploy_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub async fn service_with(
    options: &DeploymentOptions,
    source_control: FakeSourceControl,
    platform: Arc<FakePlatform>,
) -> DeploymentService {
    let service = DeploymentService::new(options, Arc::new(source_control), platform);
    service.init().await.unwrap();
    service
}
