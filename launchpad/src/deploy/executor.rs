//! Deployment lifecycle orchestrator

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use crate::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use crate::deploy::platform::{PlatformCli, STEP_RESOLVE_URL};
use crate::deploy::registry::Registry;
use crate::errors::LaunchpadError;
use crate::filesys::dir::Dir;
use crate::models::deployment::DeployOutcome;
use crate::utils::sha256_hash;

/// Serializes platform session changes per credential.
///
/// The CLI keeps one login session per host, so two jobs logging in and
/// linking projects at the same time with the same account would interleave.
/// An entry lives only while some job holds or waits for its lock.
#[derive(Default)]
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, credential: &SecretString) -> SessionGuard<'_> {
        let key = sha256_hash(credential.expose_secret().as_bytes());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };
        SessionGuard {
            locks: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, key: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map's own reference left: nobody holds or awaits the lock
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Holds a credential's session lock, forgetting the entry once unused
pub struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}

/// Drives a cloned job through the platform steps to a terminal state
pub struct Orchestrator {
    registry: Arc<Registry>,
    platform: Arc<dyn PlatformCli>,
    workspace_root: Dir,
    deploy_timeout: Duration,
    session_locks: SessionLocks,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        platform: Arc<dyn PlatformCli>,
        workspace_root: Dir,
        deploy_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            platform,
            workspace_root,
            deploy_timeout,
            session_locks: SessionLocks::default(),
        }
    }

    /// Deploy a cloned job.
    ///
    /// Failures of the platform steps are recorded on the job before being
    /// returned. Precondition failures (`NotFound`, `InvalidState`) leave the
    /// job untouched.
    pub async fn deploy(
        &self,
        id: &str,
        credential: Option<SecretString>,
    ) -> Result<DeployOutcome, LaunchpadError> {
        self.registry.update(id, |record| {
            record.process(DeploymentEvent::Deploy)?;
            record.log("starting deployment");
            Ok(())
        })?;
        info!("Deploying {}", id);

        let workspace = self.workspace_root.subdir(id);
        let steps = self.run_steps(id, workspace.path(), credential.as_ref());
        let result = match tokio::time::timeout(self.deploy_timeout, steps).await {
            Ok(result) => result,
            Err(_) => Err(LaunchpadError::DeployTimedOut(self.deploy_timeout)),
        };

        match result {
            Ok(project_url) => self.complete(id, project_url),
            Err(e) => {
                self.fail(id, &e);
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        id: &str,
        workspace: &Path,
        credential: Option<&SecretString>,
    ) -> Result<String, LaunchpadError> {
        let version = self.platform.ensure_tool_available().await?;
        self.registry
            .append_log(id, format!("tool-check: {}", version))?;

        {
            let _session = match credential {
                Some(credential) => Some(self.session_locks.acquire(credential).await),
                None => None,
            };

            if let Some(credential) = credential {
                self.platform.authenticate(credential).await?;
                self.registry.append_log(id, "authenticated with platform")?;
            }

            let init = self.platform.initialize_project(workspace).await?;
            self.registry.append_log(id, format!("init: {}", init))?;
        }

        let publish = self.platform.publish(workspace).await?;
        self.registry.append_log(id, format!("publish: {}", publish))?;

        let project_url = self.platform.resolve_public_url(workspace).await?;
        if project_url.is_empty() {
            return Err(LaunchpadError::step_failed(
                STEP_RESOLVE_URL,
                "platform returned an empty project URL",
            ));
        }
        self.registry
            .append_log(id, format!("resolve-url: {}", project_url))?;

        Ok(project_url)
    }

    fn complete(&self, id: &str, project_url: String) -> Result<DeployOutcome, LaunchpadError> {
        let outcome = self.registry.update(id, |record| {
            record.process(DeploymentEvent::DeploySuccess {
                project_url: project_url.clone(),
            })?;
            record.log(format!("deployment completed: {}", project_url));
            Ok(DeployOutcome {
                id: record.id.clone(),
                status: record.status,
                project_url: project_url.clone(),
                duration: record
                    .duration()
                    .map(|d| d.num_milliseconds())
                    .unwrap_or_default(),
            })
        })?;

        info!(
            "Deployment {} completed in {}ms: {}",
            id, outcome.duration, outcome.project_url
        );
        Ok(outcome)
    }

    fn fail(&self, id: &str, err: &LaunchpadError) {
        let message = err.to_string();
        let recorded = self.registry.update(id, |record| {
            if record.status != DeploymentStatus::Deploying {
                return Ok(());
            }
            record.process(DeploymentEvent::DeployFailed(message.clone()))?;
            record.log(format!("deployment failed: {}", message));
            Ok(())
        });

        if let Err(e) = recorded {
            debug!("Could not record failure of {}: {}", id, e);
        }
        error!("Deployment {} failed: {}", id, message);
    }
}
