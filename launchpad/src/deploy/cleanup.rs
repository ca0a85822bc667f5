//! Workspace and registry cleanup

use std::sync::Arc;

use tracing::{error, info};

use crate::deploy::registry::Registry;
use crate::errors::LaunchpadError;
use crate::filesys::dir::Dir;

/// Removes finished jobs
pub struct CleanupManager {
    registry: Arc<Registry>,
    workspace_root: Dir,
}

impl CleanupManager {
    pub fn new(registry: Arc<Registry>, workspace_root: Dir) -> Self {
        Self {
            registry,
            workspace_root,
        }
    }

    /// Remove a terminal job's workspace and evict it from the registry.
    ///
    /// Jobs that are still cloning or deploying are rejected with
    /// `DeploymentActive` and left untouched, their workspace is in use.
    pub async fn cleanup(&self, id: &str) -> Result<(), LaunchpadError> {
        let record = self
            .registry
            .get(id)
            .ok_or_else(|| LaunchpadError::NotFound(id.to_string()))?;

        if !record.status.is_terminal() {
            return Err(LaunchpadError::DeploymentActive(format!(
                "{} ({})",
                id, record.status
            )));
        }

        let workspace = self.workspace_root.subdir(id);
        if let Err(e) = workspace.delete().await {
            error!("Failed to clean up deployment {}: {}", id, e);
            return Err(LaunchpadError::CleanupFailed(format!(
                "{}: {}",
                workspace.path().display(),
                e
            )));
        }

        self.registry.remove(id);
        info!("Cleanup of deployment {} completed", id);
        Ok(())
    }
}
