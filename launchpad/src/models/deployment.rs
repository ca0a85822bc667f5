//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use crate::errors::LaunchpadError;

/// One deployment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Unique deployment ID
    #[serde(rename = "deployId")]
    pub id: String,

    /// Source repository URL
    pub repo_url: String,

    /// Branch checked out in the workspace
    pub branch: String,

    /// Current status
    pub status: DeploymentStatus,

    /// Registration time
    pub start_time: DateTime<Utc>,

    /// Set once the job reaches a terminal state
    pub end_time: Option<DateTime<Utc>>,

    /// Public URL, only on success
    pub project_url: Option<String>,

    /// Failure message, only on failure
    pub error: Option<String>,

    /// Append-only job log
    pub logs: Vec<String>,
}

impl DeploymentRecord {
    /// Create a record in the `cloning` state
    pub fn new(id: impl Into<String>, repo_url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            repo_url: repo_url.into(),
            branch: branch.into(),
            status: DeploymentStatus::Cloning,
            start_time: Utc::now(),
            end_time: None,
            project_url: None,
            error: None,
            logs: Vec::new(),
        }
    }

    /// Append a line to the job log
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Apply an event, updating the status and the fields it owns
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), LaunchpadError> {
        let next = self
            .status
            .next(&event)
            .map_err(|e| LaunchpadError::InvalidState(format!("deployment {}: {}", self.id, e)))?;

        match event {
            DeploymentEvent::DeploySuccess { project_url } => {
                self.project_url = Some(project_url);
                self.end_time = Some(Utc::now());
            }
            DeploymentEvent::DeployFailed(error) => {
                self.error = Some(error);
                self.end_time = Some(Utc::now());
            }
            DeploymentEvent::Cloned | DeploymentEvent::Deploy => {}
        }

        self.status = next;
        Ok(())
    }

    /// Elapsed time between registration and the terminal state
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Summary without logs
    pub fn summary(&self) -> DeploymentSummary {
        DeploymentSummary {
            id: self.id.clone(),
            repo_url: self.repo_url.clone(),
            branch: self.branch.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            project_url: self.project_url.clone(),
            error: self.error.clone(),
        }
    }
}

/// A deployment record without its logs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    #[serde(rename = "deployId")]
    pub id: String,
    pub repo_url: String,
    pub branch: String,
    pub status: DeploymentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub project_url: Option<String>,
    pub error: Option<String>,
}

/// Result of a successful deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    #[serde(rename = "deployId")]
    pub id: String,
    pub status: DeploymentStatus,
    pub project_url: String,
    /// Milliseconds between registration and completion
    pub duration: i64,
}
