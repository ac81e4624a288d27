//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::GateError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Whether the directory exists and is not read-only
    pub async fn is_writable(&self) -> bool {
        match fs::metadata(&self.path).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), GateError> {
        fs::create_dir_all(&self.path).await.map_err(|e| {
            GateError::Filesystem(format!(
                "failed to create directory {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), GateError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await.map_err(|e| {
                GateError::Filesystem(format!(
                    "failed to delete directory {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// List subdirectories
    pub async fn list_dirs(&self) -> Result<Vec<PathBuf>, GateError> {
        let mut dirs = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.path());
            }
        }

        dirs.sort();
        Ok(dirs)
    }

    /// Get a file within this directory
    pub fn file(&self, name: impl AsRef<Path>) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: impl AsRef<Path>) -> Dir {
        Dir::new(self.path.join(name))
    }
}
