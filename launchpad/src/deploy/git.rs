//! Repository fetcher
//!
//! Clones a repository into a per-job workspace under the workspace root and
//! checks out the requested branch. The job is registered before any I/O so
//! it holds its concurrency slot while cloning; on failure the workspace and
//! the registration are rolled back.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::deploy::command::run_command;
use crate::deploy::fsm::DeploymentEvent;
use crate::deploy::registry::Registry;
use crate::errors::LaunchpadError;
use crate::filesys::dir::Dir;
use crate::models::deployment::DeploymentRecord;
use crate::utils::generate_uuid;

/// Source-control client
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clone `repo_url` into the existing, empty `target_dir`
    async fn clone_repository(&self, repo_url: &str, target_dir: &Path) -> Result<(), LaunchpadError>;

    /// Check out `branch` in a cloned repository
    async fn checkout(&self, repo_dir: &Path, branch: &str) -> Result<(), LaunchpadError>;
}

/// `git` command line client
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
}

impl GitCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_repository(&self, repo_url: &str, target_dir: &Path) -> Result<(), LaunchpadError> {
        let target = target_dir.to_string_lossy();
        let output = run_command(
            &self.binary,
            &["clone", "--quiet", "--", repo_url, target.as_ref()],
            None,
        )
        .await
        .map_err(|e| LaunchpadError::CloneFailed(format!("failed to run git clone: {}", e)))?;

        if !output.success {
            return Err(LaunchpadError::CloneFailed(output.failure_text()));
        }
        Ok(())
    }

    async fn checkout(&self, repo_dir: &Path, branch: &str) -> Result<(), LaunchpadError> {
        // The trailing "--" makes git resolve `branch` as a ref, never as a path
        let output = run_command(&self.binary, &["checkout", "--quiet", branch, "--"], Some(repo_dir))
            .await
            .map_err(|e| LaunchpadError::CheckoutFailed(format!("failed to run git checkout: {}", e)))?;

        if !output.success {
            return Err(LaunchpadError::CheckoutFailed(format!(
                "branch '{}': {}",
                branch,
                output.failure_text()
            )));
        }
        Ok(())
    }
}

/// Fetches repositories into per-job workspaces
pub struct RepositoryFetcher {
    registry: Arc<Registry>,
    source_control: Arc<dyn SourceControl>,
    workspace_root: Dir,
}

impl RepositoryFetcher {
    pub fn new(
        registry: Arc<Registry>,
        source_control: Arc<dyn SourceControl>,
        workspace_root: Dir,
    ) -> Self {
        Self {
            registry,
            source_control,
            workspace_root,
        }
    }

    /// Admit a new job and clone its repository, returning the job id
    pub async fn clone(&self, repo_url: &str, branch: &str) -> Result<String, LaunchpadError> {
        let id = generate_uuid();
        self.registry
            .try_admit(DeploymentRecord::new(&id, repo_url, branch))?;

        let workspace = self.workspace_root.subdir(&id);
        match self.fetch(&id, &workspace, repo_url, branch).await {
            Ok(()) => {
                info!("Repository cloned: {} (branch: {})", repo_url, branch);
                Ok(id)
            }
            Err(e) => {
                if let Err(cleanup_err) = workspace.delete().await {
                    warn!(
                        "Failed to remove workspace {} after clone failure: {}",
                        workspace.path().display(),
                        cleanup_err
                    );
                }
                self.registry.remove(&id);
                error!("Failed to clone repository {}: {}", repo_url, e);
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        id: &str,
        workspace: &Dir,
        repo_url: &str,
        branch: &str,
    ) -> Result<(), LaunchpadError> {
        debug!("Creating workspace {}", workspace.path().display());
        workspace.create().await.map_err(|e| {
            LaunchpadError::WorkspaceError(format!(
                "failed to create {}: {}",
                workspace.path().display(),
                e
            ))
        })?;

        self.source_control
            .clone_repository(repo_url, workspace.path())
            .await?;
        self.source_control.checkout(workspace.path(), branch).await?;

        let line = format!("repository cloned: {} (branch: {})", repo_url, branch);
        self.registry.update(id, move |record| {
            record.process(DeploymentEvent::Cloned)?;
            record.log(line);
            Ok(())
        })
    }
}
