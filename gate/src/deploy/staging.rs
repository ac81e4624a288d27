//! Isolated staging area

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use crate::deploy::manifest::{relative_path, ManifestEntry, StagedManifest};
use crate::errors::GateError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::deployment::SubmittedFile;
use crate::models::target::Target;
use crate::utils::sha256_hash;

/// Marker files that keep a staging directory from being served
pub const PROTECTION_FILES: [(&str, &str); 2] = [
    (".htaccess", "Deny from all\n"),
    ("index.php", "<?php\n// Silence is golden.\n"),
];

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FILES_DIR: &str = "files";
pub const BACKUPS_DIR: &str = "backups";

/// Staging root, one subdirectory per deployment id
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: Dir,
}

impl StagingArea {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: Dir::new(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Dir {
        &self.root
    }

    /// Create the staging root and protect it
    pub async fn init(&self) -> Result<(), GateError> {
        self.root.create().await?;
        protect(&self.root).await
    }

    pub fn deployment_dir(&self, deployment_id: u64) -> Dir {
        self.root.subdir(deployment_id.to_string())
    }

    pub fn files_dir(&self, deployment_id: u64) -> Dir {
        self.deployment_dir(deployment_id).subdir(FILES_DIR)
    }

    pub fn backups_dir(&self, deployment_id: u64) -> Dir {
        self.deployment_dir(deployment_id).subdir(BACKUPS_DIR)
    }

    pub fn manifest_file(&self, deployment_id: u64) -> File {
        self.deployment_dir(deployment_id).file(MANIFEST_FILE)
    }

    /// Write a file set into the staging directory for `deployment_id`.
    ///
    /// Re-staging the same id overwrites whatever was staged before. Nothing
    /// is cleaned up on failure.
    pub async fn stage(
        &self,
        deployment_id: u64,
        files: &[SubmittedFile],
        target: &Target,
    ) -> Result<StagedManifest, GateError> {
        let base = self.deployment_dir(deployment_id);
        let files_dir = self.files_dir(deployment_id);
        let backups_dir = self.backups_dir(deployment_id);

        for dir in [&base, &files_dir, &backups_dir] {
            dir.create().await?;
        }
        protect(&base).await?;

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let rel = relative_path(&file.path)?;
            let bytes = file.decode().map_err(|e| {
                GateError::Filesystem(format!("failed to decode {}: {}", file.path, e))
            })?;

            files_dir.file(&rel).write_bytes(&bytes).await?;

            debug!(deployment_id, path = %file.path, size = bytes.len(), "Staged file");
            entries.push(ManifestEntry {
                path: file.path.clone(),
                hash: sha256_hash(&bytes),
                size: bytes.len() as u64,
            });
        }

        let manifest = StagedManifest {
            deployment_id,
            target: target.clone(),
            files: entries,
            staged_at: Utc::now(),
        };
        self.manifest_file(deployment_id)
            .write_json_atomic(&manifest)
            .await?;

        info!(
            deployment_id,
            files = manifest.files.len(),
            bytes = manifest.total_size(),
            "Deployment staged"
        );
        Ok(manifest)
    }

    /// Load the manifest for a deployment; missing or unparsable is an error
    pub async fn load_manifest(&self, deployment_id: u64) -> Result<StagedManifest, GateError> {
        let file = self.manifest_file(deployment_id);
        if !file.exists().await {
            return Err(GateError::Filesystem(format!(
                "no staged manifest for deployment {}",
                deployment_id
            )));
        }

        file.read_json::<StagedManifest>().await.map_err(|e| {
            GateError::Filesystem(format!(
                "unreadable manifest for deployment {}: {}",
                deployment_id, e
            ))
        })
    }
}

async fn protect(dir: &Dir) -> Result<(), GateError> {
    for (name, contents) in PROTECTION_FILES {
        let file = dir.file(name);
        if !file.exists().await {
            file.write_bytes(contents.as_bytes()).await?;
        }
    }
    Ok(())
}
