//! Reviewer notifications

use async_trait::async_trait;
use tracing::info;

use crate::models::deployment::DeploymentRecord;

/// Tells reviewers a new deployment is waiting
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deployment_submitted(&self, record: &DeploymentRecord);
}

/// Emits the notification as a structured log event for an external relay
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deployment_submitted(&self, record: &DeploymentRecord) {
        info!(
            target: "stagegate::notify",
            deployment_id = record.id,
            name = %record.name,
            target_dir = %record.target,
            files = record.file_count(),
            warnings = record.validation_result.warnings.len(),
            created_by = %record.created_by,
            "New deployment awaiting review"
        );
    }
}
