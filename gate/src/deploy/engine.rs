//! Apply and rollback of staged deployments

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deploy::cleanup::CleanupReport;
use crate::deploy::staging::StagingArea;
use crate::deploy::targets::TargetRoots;
use crate::errors::GateError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::utils::sha256_hash;

/// Files touched by a successful execute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteReport {
    /// Paths that existed before and were copied to `backups/`
    pub backed_up: Vec<String>,
    /// Paths written and hash-verified
    pub applied: Vec<String>,
}

/// A single file the rollback could not restore or remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Per-file outcome of a rollback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// Overwritten files restored from backup
    pub restored: Vec<String>,
    /// Newly created files deleted again
    pub removed: Vec<String>,
    /// Newly created files that were already gone
    pub untouched: Vec<String>,
    pub failed: Vec<FileFailure>,
}

impl RollbackReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.restored.len() + self.removed.len() + self.untouched.len() + self.failed.len()
    }
}

/// Performs the filesystem effects of a deployment
#[derive(Debug, Clone)]
pub struct DeploymentEngine {
    staging: StagingArea,
    roots: TargetRoots,
}

impl DeploymentEngine {
    pub fn new(staging: StagingArea, roots: TargetRoots) -> Self {
        Self { staging, roots }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn roots(&self) -> &TargetRoots {
        &self.roots
    }

    /// Back up what is about to be overwritten, then write and verify every
    /// staged file. A failure part way leaves earlier writes in place.
    pub async fn execute(&self, deployment_id: u64) -> Result<ExecuteReport, GateError> {
        let manifest = self.staging.load_manifest(deployment_id).await?;
        let target_dir = Dir::new(self.roots.resolve(&manifest.target));
        let files_dir = self.staging.files_dir(deployment_id);
        let backups_dir = self.staging.backups_dir(deployment_id);

        info!(
            deployment_id,
            target = %manifest.target,
            files = manifest.files.len(),
            "Executing deployment"
        );

        let mut report = ExecuteReport::default();

        // backup phase
        for entry in &manifest.files {
            let rel = entry.relative_path()?;
            let existing = target_dir.file(&rel);
            if !existing.exists().await {
                continue;
            }

            let original = existing.read_bytes().await?;
            backups_dir.file(&rel).write_bytes(&original).await?;
            debug!(deployment_id, path = %entry.path, "Backed up existing file");
            report.backed_up.push(entry.path.clone());
        }

        // apply phase
        for entry in &manifest.files {
            let rel = entry.relative_path()?;
            let content = files_dir.file(&rel).read_bytes().await?;
            let dest = target_dir.file(&rel);
            dest.write_bytes(&content).await?;

            let actual = sha256_hash(&dest.read_bytes().await?);
            if actual != entry.hash {
                warn!(deployment_id, path = %entry.path, "Hash mismatch after write");
                return Err(GateError::Integrity {
                    path: entry.path.clone(),
                    expected: entry.hash.clone(),
                    actual,
                });
            }
            debug!(deployment_id, path = %entry.path, "Applied file");
            report.applied.push(entry.path.clone());
        }

        info!(
            deployment_id,
            applied = report.applied.len(),
            backed_up = report.backed_up.len(),
            "Deployment applied"
        );
        Ok(report)
    }

    /// Restore backups and delete files the deployment created.
    ///
    /// Only a missing manifest fails the call; per-file failures are
    /// collected into the report and the loop carries on.
    pub async fn rollback(&self, deployment_id: u64) -> Result<RollbackReport, GateError> {
        let manifest = self.staging.load_manifest(deployment_id).await?;
        let target_dir = Dir::new(self.roots.resolve(&manifest.target));
        let backups_dir = self.staging.backups_dir(deployment_id);

        info!(deployment_id, target = %manifest.target, "Rolling back deployment");

        let mut report = RollbackReport::default();
        for entry in &manifest.files {
            let rel = match entry.relative_path() {
                Ok(rel) => rel,
                Err(e) => {
                    report.failed.push(FileFailure {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let backup = backups_dir.file(&rel);
            let dest = target_dir.file(&rel);
            let outcome = if backup.exists().await {
                restore(&backup, &dest).await.map(|_| Reverted::Restored)
            } else if dest.exists().await {
                dest.delete().await.map(|_| Reverted::Removed)
            } else {
                Ok(Reverted::Untouched)
            };

            let path = entry.path.clone();
            match outcome {
                Ok(Reverted::Restored) => report.restored.push(path),
                Ok(Reverted::Removed) => report.removed.push(path),
                Ok(Reverted::Untouched) => report.untouched.push(path),
                Err(e) => {
                    warn!(deployment_id, path = %path, error = %e, "Rollback failed for file");
                    report.failed.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            deployment_id,
            restored = report.restored.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Rollback finished"
        );
        Ok(report)
    }

    /// Remove staging directories older than `older_than_days`
    pub async fn cleanup(&self, older_than_days: u32) -> Result<CleanupReport, GateError> {
        self.staging.sweep(older_than_days, chrono::Utc::now()).await
    }
}

enum Reverted {
    Restored,
    Removed,
    Untouched,
}

async fn restore(backup: &File, dest: &File) -> Result<(), GateError> {
    let original = backup.read_bytes().await?;
    dest.write_bytes(&original).await
}
