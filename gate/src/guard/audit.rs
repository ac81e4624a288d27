//! Append-only audit trail, newest first, capped

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::GateError;
use crate::filesys::file::File;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DeploymentSubmitted,
    DeploymentApproved,
    DeploymentFailed,
    DeploymentRejected,
    DeploymentRolledBack,
    RollbackFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DeploymentSubmitted => "deployment_submitted",
            AuditAction::DeploymentApproved => "deployment_approved",
            AuditAction::DeploymentFailed => "deployment_failed",
            AuditAction::DeploymentRejected => "deployment_rejected",
            AuditAction::DeploymentRolledBack => "deployment_rolled_back",
            AuditAction::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub action: AuditAction,
    pub details: Value,
    pub source_ip: Option<String>,
}

/// Ring buffer of audit entries, optionally mirrored to a JSON file
#[derive(Debug)]
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    max_entries: usize,
    file: Option<File>,
}

impl AuditLog {
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: max_entries.max(1),
            file: None,
        }
    }

    /// Open a log backed by `file`, loading existing entries if present
    pub async fn open(file: File, max_entries: usize) -> Result<Self, GateError> {
        let max_entries = max_entries.max(1);
        let mut entries: VecDeque<AuditEntry> = if file.exists().await {
            file.read_json().await?
        } else {
            VecDeque::new()
        };
        entries.truncate(max_entries);

        Ok(Self {
            entries: RwLock::new(entries),
            max_entries,
            file: Some(file),
        })
    }

    /// Append one entry, evicting the oldest beyond the cap.
    ///
    /// A failed write to the backing file is logged; the entry stays in memory.
    pub async fn record(
        &self,
        actor_id: &str,
        action: AuditAction,
        details: Value,
        source_ip: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            actor_id: actor_id.to_string(),
            action,
            details,
            source_ip,
        };
        info!(actor_id, action = %action, details = %entry.details, "Audit");

        let mut entries = self.entries.write().await;
        entries.push_front(entry);
        entries.truncate(self.max_entries);

        if let Some(file) = &self.file {
            if let Err(e) = file.write_json_atomic(&*entries).await {
                warn!(error = %e, "Failed to persist audit log");
            }
        }
    }

    /// Up to `limit` entries, newest first
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
