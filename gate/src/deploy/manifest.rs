//! Staged manifest

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GateError;
use crate::models::target::Target;

/// One staged file, content-addressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub hash: String,
    pub size: u64,
}

impl ManifestEntry {
    /// The entry path as a relative filesystem path
    pub fn relative_path(&self) -> Result<PathBuf, GateError> {
        relative_path(&self.path)
    }
}

/// What a deployment will apply; written once at staging and never changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedManifest {
    pub deployment_id: u64,
    pub target: Target,
    pub files: Vec<ManifestEntry>,
    pub staged_at: DateTime<Utc>,
}

impl StagedManifest {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Turn a submitted path into a relative path made only of normal components.
///
/// The validator already rejects traversal; this keeps the filesystem layer
/// from ever joining anything else onto a root.
pub fn relative_path(path: &str) -> Result<PathBuf, GateError> {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(GateError::Filesystem(format!(
                    "refusing to resolve path outside of its root: {}",
                    path
                )))
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(GateError::Filesystem(format!("empty relative path: {:?}", path)));
    }
    Ok(out)
}
