//! Directory operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::LaunchpadError;

/// A directory on disk
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Child directory named `name`
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    pub async fn exists(&self) -> bool {
        matches!(fs::metadata(&self.path).await, Ok(meta) if meta.is_dir())
    }

    /// Create the directory along with missing parents
    pub async fn create(&self) -> Result<(), LaunchpadError> {
        fs::create_dir_all(&self.path).await.map_err(Into::into)
    }

    /// Recursively remove the directory. Removing a missing directory succeeds.
    pub async fn delete(&self) -> Result<(), LaunchpadError> {
        if let Err(e) = fs::remove_dir_all(&self.path).await {
            if e.kind() != ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        Ok(())
    }
}
