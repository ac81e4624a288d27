//! File operations

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::GateError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, GateError> {
        fs::read(&self.path).await.map_err(|e| {
            GateError::Filesystem(format!("failed to read {}: {}", self.path.display(), e))
        })
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, GateError> {
        let contents = self.read_bytes().await?;
        let value = serde_json::from_slice(&contents)?;
        Ok(value)
    }

    /// Write bytes to file, creating parent directories as needed
    pub async fn write_bytes(&self, contents: &[u8]) -> Result<(), GateError> {
        self.write_impl(&self.path, contents).await.map_err(|e| {
            GateError::Filesystem(format!("failed to write {}: {}", self.path.display(), e))
        })
    }

    /// Write JSON to file
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), GateError> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_bytes(&contents).await
    }

    /// Atomic write using a temporary file
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), GateError> {
        let temp_path = self.path.with_extension("tmp");

        self.write_impl(&temp_path, contents).await.map_err(|e| {
            GateError::Filesystem(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            GateError::Filesystem(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Atomic JSON write
    pub async fn write_json_atomic<T: Serialize>(&self, value: &T) -> Result<(), GateError> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_atomic(&contents).await
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), GateError> {
        if self.exists().await {
            fs::remove_file(&self.path).await.map_err(|e| {
                GateError::Filesystem(format!("failed to delete {}: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }

    /// Last modification time
    pub async fn modified(&self) -> Result<SystemTime, GateError> {
        let meta = fs::metadata(&self.path).await?;
        Ok(meta.modified()?)
    }

    async fn write_impl(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }
}
