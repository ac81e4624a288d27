//! Retention sweep over the staging root

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deploy::manifest::StagedManifest;
use crate::deploy::staging::{StagingArea, MANIFEST_FILE};
use crate::errors::GateError;
use crate::filesys::dir::Dir;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub kept: usize,
    /// Directories without a manifest
    pub skipped: usize,
}

impl StagingArea {
    /// Delete every staging directory whose manifest is older than
    /// `older_than_days` relative to `now`.
    pub async fn sweep(
        &self,
        older_than_days: u32,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, GateError> {
        let mut report = CleanupReport::default();
        if !self.root().exists().await {
            return Ok(report);
        }

        let cutoff = now - Duration::days(i64::from(older_than_days));

        for path in self.root().list_dirs().await? {
            let dir = Dir::new(&path);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let manifest = dir.file(MANIFEST_FILE);
            if !manifest.exists().await {
                debug!(dir = %name, "Skipping staging directory without manifest");
                report.skipped += 1;
                continue;
            }

            let staged_at = match manifest.read_json::<StagedManifest>().await {
                Ok(m) => m.staged_at,
                Err(_) => match manifest.modified().await {
                    Ok(mtime) => DateTime::<Utc>::from(mtime),
                    Err(e) => {
                        warn!(dir = %name, error = %e, "Cannot date staging directory");
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            if staged_at >= cutoff {
                report.kept += 1;
                continue;
            }

            dir.delete().await?;
            debug!(dir = %name, %staged_at, "Removed staging directory");
            report.removed.push(name);
        }

        info!(
            removed = report.removed.len(),
            kept = report.kept,
            skipped = report.skipped,
            "Staging cleanup finished"
        );
        Ok(report)
    }
}
