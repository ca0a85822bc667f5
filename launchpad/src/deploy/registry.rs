//! In-memory deployment registry
//!
//! The registry is the single source of truth for job state. Admission is
//! evaluated and the record inserted under one write lock, so the concurrency
//! ceiling holds even when requests race on different worker threads.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::LaunchpadError;
use crate::models::deployment::{DeploymentRecord, DeploymentSummary};

/// Deployment registry with an admission ceiling
pub struct Registry {
    entries: RwLock<HashMap<String, DeploymentRecord>>,
    capacity: usize,
}

impl Registry {
    /// Create a new registry admitting at most `capacity` jobs
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Maximum number of registered jobs
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit and register a record in one step.
    ///
    /// Fails with `ResourceExhausted` when the registry is full, leaving it
    /// unchanged.
    pub fn try_admit(&self, record: DeploymentRecord) -> Result<(), LaunchpadError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if entries.len() >= self.capacity {
            return Err(LaunchpadError::ResourceExhausted(self.capacity));
        }
        if entries.contains_key(&record.id) {
            return Err(LaunchpadError::Internal(format!(
                "duplicate deployment id: {}",
                record.id
            )));
        }

        entries.insert(record.id.clone(), record);
        Ok(())
    }

    /// Get a snapshot of a record
    pub fn get(&self, id: &str) -> Option<DeploymentRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).cloned()
    }

    /// Mutate a record in place
    pub fn update<T, F>(&self, id: &str, f: F) -> Result<T, LaunchpadError>
    where
        F: FnOnce(&mut DeploymentRecord) -> Result<T, LaunchpadError>,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let record = entries
            .get_mut(id)
            .ok_or_else(|| LaunchpadError::NotFound(id.to_string()))?;
        f(record)
    }

    /// Append a line to a record's log
    pub fn append_log(&self, id: &str, line: impl Into<String>) -> Result<(), LaunchpadError> {
        let line = line.into();
        self.update(id, move |record| {
            record.log(line);
            Ok(())
        })
    }

    /// Remove a record
    pub fn remove(&self, id: &str) -> Option<DeploymentRecord> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(id)
    }

    /// Summaries of every registered record, in no particular order
    pub fn summaries(&self) -> Vec<DeploymentSummary> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().map(DeploymentRecord::summary).collect()
    }

    /// Number of registered records
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
