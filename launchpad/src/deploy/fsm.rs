//! Finite state machine for a deployment job

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Registered, repository is being fetched
    Cloning,

    /// Repository fetched, waiting for the deploy task
    Cloned,

    /// Platform steps in progress
    Deploying,

    /// Published successfully
    Completed,

    /// A platform step failed
    Failed,
}

impl DeploymentStatus {
    /// Terminal states accept no further events
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Completed | DeploymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Cloning => "cloning",
            DeploymentStatus::Cloned => "cloned",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Completed => "completed",
            DeploymentStatus::Failed => "failed",
        }
    }

    /// Compute the next status for an event
    pub fn next(&self, event: &DeploymentEvent) -> Result<DeploymentStatus, String> {
        let next = match (self, event) {
            (DeploymentStatus::Cloning, DeploymentEvent::Cloned) => DeploymentStatus::Cloned,
            (DeploymentStatus::Cloned, DeploymentEvent::Deploy) => DeploymentStatus::Deploying,
            (DeploymentStatus::Deploying, DeploymentEvent::DeploySuccess { .. }) => {
                DeploymentStatus::Completed
            }
            (DeploymentStatus::Deploying, DeploymentEvent::DeployFailed(_)) => {
                DeploymentStatus::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!(
                    "Invalid transition: {} -> {}",
                    state,
                    event.name()
                ));
            }
        };
        Ok(next)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Repository cloned and branch checked out
    Cloned,

    /// Start the platform steps
    Deploy,

    /// All platform steps succeeded
    DeploySuccess { project_url: String },

    /// A platform step failed
    DeployFailed(String),
}

impl DeploymentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DeploymentEvent::Cloned => "cloned",
            DeploymentEvent::Deploy => "deploy",
            DeploymentEvent::DeploySuccess { .. } => "deploy_success",
            DeploymentEvent::DeployFailed(_) => "deploy_failed",
        }
    }
}
