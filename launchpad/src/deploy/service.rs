//! Deployment service
//!
//! Owns the registry and the components built around it, and exposes the
//! operations consumed by the HTTP layer.

use std::path::Path;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::app::options::DeploymentOptions;
use crate::deploy::cleanup::CleanupManager;
use crate::deploy::executor::Orchestrator;
use crate::deploy::git::{RepositoryFetcher, SourceControl};
use crate::deploy::platform::PlatformCli;
use crate::deploy::registry::Registry;
use crate::errors::LaunchpadError;
use crate::filesys::dir::Dir;
use crate::models::deployment::{DeployOutcome, DeploymentRecord, DeploymentSummary};

pub struct DeploymentService {
    registry: Arc<Registry>,
    workspace_root: Dir,
    fetcher: RepositoryFetcher,
    orchestrator: Arc<Orchestrator>,
    cleanup: CleanupManager,
    platform: Arc<dyn PlatformCli>,
    default_credential: Option<SecretString>,
    tasks: Mutex<JoinSet<()>>,
}

impl DeploymentService {
    pub fn new(
        options: &DeploymentOptions,
        source_control: Arc<dyn SourceControl>,
        platform: Arc<dyn PlatformCli>,
    ) -> Self {
        let registry = Arc::new(Registry::new(options.max_concurrent_deployments));
        let workspace_root = Dir::new(&options.workspace_root);

        Self {
            fetcher: RepositoryFetcher::new(
                registry.clone(),
                source_control,
                workspace_root.clone(),
            ),
            orchestrator: Arc::new(Orchestrator::new(
                registry.clone(),
                platform.clone(),
                workspace_root.clone(),
                options.deploy_timeout,
            )),
            cleanup: CleanupManager::new(registry.clone(), workspace_root.clone()),
            registry,
            workspace_root,
            platform,
            default_credential: options.platform_api_token.clone(),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Create the workspace root
    pub async fn init(&self) -> Result<(), LaunchpadError> {
        self.workspace_root.create().await.map_err(|e| {
            LaunchpadError::WorkspaceError(format!(
                "failed to initialize workspace root {}: {}",
                self.workspace_root.path().display(),
                e
            ))
        })?;
        info!(
            "Workspace root initialized: {}",
            self.workspace_root.path().display()
        );
        Ok(())
    }

    /// Admit a new job and clone its repository
    pub async fn admit_and_clone(&self, repo_url: &str, branch: &str) -> Result<String, LaunchpadError> {
        self.fetcher.clone(repo_url, branch).await
    }

    /// Deploy a cloned job in the background.
    ///
    /// A per-request credential takes precedence over the configured one.
    /// Failures are recorded on the job and logged, never returned.
    pub fn spawn_deploy(&self, id: String, credential: Option<SecretString>) {
        let credential = credential.or_else(|| self.default_credential.clone());
        let orchestrator = self.orchestrator.clone();

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished tasks so the set only tracks running deployments
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            if let Err(e) = orchestrator.deploy(&id, credential).await {
                error!("Background deployment {} failed: {}", id, e);
            }
        });
    }

    /// Deploy a cloned job and wait for the outcome
    pub async fn deploy(
        &self,
        id: &str,
        credential: Option<SecretString>,
    ) -> Result<DeployOutcome, LaunchpadError> {
        let credential = credential.or_else(|| self.default_credential.clone());
        self.orchestrator.deploy(id, credential).await
    }

    /// Snapshot of one job
    pub fn get_status(&self, id: &str) -> Result<DeploymentRecord, LaunchpadError> {
        self.registry
            .get(id)
            .ok_or_else(|| LaunchpadError::NotFound(id.to_string()))
    }

    /// Summaries of every registered job
    pub fn list_all(&self) -> Vec<DeploymentSummary> {
        self.registry.summaries()
    }

    /// Remove a terminal job
    pub async fn cleanup(&self, id: &str) -> Result<(), LaunchpadError> {
        self.cleanup.cleanup(id).await
    }

    /// Number of registered jobs
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Admission ceiling
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    pub fn workspace_root(&self) -> &Path {
        self.workspace_root.path()
    }

    pub fn platform(&self) -> &Arc<dyn PlatformCli> {
        &self.platform
    }

    /// Abort running deployments. Their subprocesses are killed with them.
    pub async fn shutdown(&self) {
        let mut tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *tasks)
        };

        if !tasks.is_empty() {
            info!("Aborting {} running deployment(s)...", tasks.len());
        }
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }
}
