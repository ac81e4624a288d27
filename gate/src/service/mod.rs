//! Deployment service
//!
//! Wires the validator, staging and engine, the record store, the access
//! guard and the notifier together. Built once at start and shared.

pub mod notify;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

use crate::authn::actor::RequestContext;
use crate::deploy::cleanup::CleanupReport;
use crate::deploy::engine::{DeploymentEngine, RollbackReport};
use crate::deploy::fsm::{check_transition, DeploymentStatus};
use crate::errors::GateError;
use crate::filesys::dir::Dir;
use crate::guard::audit::{AuditAction, AuditEntry};
use crate::guard::AccessGuard;
use crate::models::deployment::{DeploymentRecord, NewDeployment, Submission, TransitionFields};
use crate::models::target::{Target, TargetType};
use crate::models::validation::{Finding, FindingCode, ValidationReport};
use crate::service::notify::Notifier;
use crate::store::{DeploymentStore, ListPage, ListQuery};
use crate::utils::version_info;
use crate::validate::{ValidationLimits, Validator};

/// Result of a complete rollback
#[derive(Debug, Clone)]
pub struct RollbackOutcome {
    pub record: DeploymentRecord,
    pub report: RollbackReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStatus {
    pub staging: bool,
    pub themes: bool,
    pub plugins: bool,
    pub mu_plugins: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub enabled: bool,
    pub https: bool,
    pub writable: DirectoryStatus,
    pub max_file_size: u64,
    pub max_deployment_size: u64,
    pub notify_email: bool,
}

pub struct DeploymentService {
    validator: Validator,
    limits: ValidationLimits,
    engine: DeploymentEngine,
    store: Arc<dyn DeploymentStore>,
    guard: AccessGuard,
    notifier: Option<Arc<dyn Notifier>>,
    /// Held from the status check until the transition for approve,
    /// reject and rollback
    review_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeploymentService {
    pub fn new(
        validator: Validator,
        limits: ValidationLimits,
        engine: DeploymentEngine,
        store: Arc<dyn DeploymentStore>,
        guard: AccessGuard,
    ) -> Self {
        Self {
            validator,
            limits,
            engine,
            store,
            guard,
            notifier: None,
            review_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Serialize review operations on one deployment id
    async fn lock_deployment(&self, id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .review_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn engine(&self) -> &DeploymentEngine {
        &self.engine
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validate, record and stage a proposal.
    ///
    /// Nothing is recorded when validation fails. A staging failure leaves
    /// the record in `failed` with a `staging_failed` finding.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        submission: Submission,
    ) -> Result<DeploymentRecord, GateError> {
        self.guard.authorize_mutation(ctx)?;

        let mut report = self
            .validator
            .validate(
                &submission.files,
                &submission.target.target_type,
                &submission.target.slug,
                &self.limits,
            )
            .await;

        let name = submission.name.trim().to_string();
        if name.is_empty() {
            report.push_error(Finding::new(
                FindingCode::InvalidName,
                "Deployment name must not be empty.",
            ));
        }

        if !report.valid {
            info!(
                actor_id = %ctx.actor.id,
                errors = report.errors.len(),
                "Submission rejected by validation"
            );
            return Err(GateError::Validation(report));
        }

        let kind: TargetType = submission
            .target
            .target_type
            .parse()
            .map_err(GateError::Internal)?;
        let target = Target::new(kind, submission.target.slug);

        let record = self
            .store
            .create(NewDeployment {
                name,
                description: submission.description.unwrap_or_default(),
                target: target.clone(),
                files_manifest: submission.files,
                validation_result: report.clone(),
                created_by: ctx.actor.id.clone(),
            })
            .await?;

        if let Err(e) = self
            .engine
            .staging()
            .stage(record.id, &record.files_manifest, &target)
            .await
        {
            error!(deployment_id = record.id, error = %e, "Staging failed");
            let failed = ValidationReport::new(
                vec![Finding::new(
                    FindingCode::StagingFailed,
                    format!("Failed to stage files: {}", e),
                )],
                report.warnings,
            );
            if let Err(te) = self
                .store
                .transition(
                    record.id,
                    DeploymentStatus::Failed,
                    TransitionFields::default().with_validation(failed),
                )
                .await
            {
                error!(deployment_id = record.id, error = %te, "Could not mark deployment failed");
            }
            return Err(e);
        }

        self.guard
            .audit()
            .record(
                &ctx.actor.id,
                AuditAction::DeploymentSubmitted,
                json!({
                    "deployment_id": record.id,
                    "name": record.name,
                    "target": target.to_string(),
                    "file_count": record.file_count(),
                }),
                ctx.source_ip.clone(),
            )
            .await;

        if let Some(notifier) = &self.notifier {
            notifier.deployment_submitted(&record).await;
        }

        info!(deployment_id = record.id, target = %target, "Deployment submitted");
        Ok(record)
    }

    pub async fn get(&self, id: u64) -> Result<DeploymentRecord, GateError> {
        self.store.get(id).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ListPage, GateError> {
        self.store.list(query).await
    }

    /// Apply a pending deployment. Any apply failure marks it `failed`.
    pub async fn approve(
        &self,
        ctx: &RequestContext,
        id: u64,
    ) -> Result<DeploymentRecord, GateError> {
        self.guard.authorize_mutation(ctx)?;
        let _review = self.lock_deployment(id).await;

        let record = self.store.get(id).await?;
        check_transition(record.status, DeploymentStatus::Deployed)?;

        let now = Utc::now();
        match self.engine.execute(id).await {
            Ok(report) => {
                let updated = self
                    .store
                    .transition(
                        id,
                        DeploymentStatus::Deployed,
                        TransitionFields::reviewed(&ctx.actor.id, now).deployed_at(now),
                    )
                    .await?;

                self.guard
                    .audit()
                    .record(
                        &ctx.actor.id,
                        AuditAction::DeploymentApproved,
                        json!({
                            "deployment_id": id,
                            "applied": report.applied.len(),
                            "backed_up": report.backed_up.len(),
                        }),
                        ctx.source_ip.clone(),
                    )
                    .await;

                info!(deployment_id = id, actor_id = %ctx.actor.id, "Deployment approved");
                Ok(updated)
            }
            Err(e) => {
                error!(deployment_id = id, error = %e, "Deployment failed");
                if let Err(te) = self
                    .store
                    .transition(
                        id,
                        DeploymentStatus::Failed,
                        TransitionFields::reviewed(&ctx.actor.id, now),
                    )
                    .await
                {
                    error!(deployment_id = id, error = %te, "Could not mark deployment failed");
                }

                self.guard
                    .audit()
                    .record(
                        &ctx.actor.id,
                        AuditAction::DeploymentFailed,
                        json!({ "deployment_id": id, "error": e.to_string() }),
                        ctx.source_ip.clone(),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Refuse a pending deployment. Only the privilege check applies.
    pub async fn reject(
        &self,
        ctx: &RequestContext,
        id: u64,
    ) -> Result<DeploymentRecord, GateError> {
        self.guard.require_privileged(ctx)?;
        let _review = self.lock_deployment(id).await;

        let updated = self
            .store
            .transition(
                id,
                DeploymentStatus::Rejected,
                TransitionFields::reviewed(&ctx.actor.id, Utc::now()),
            )
            .await?;

        self.guard
            .audit()
            .record(
                &ctx.actor.id,
                AuditAction::DeploymentRejected,
                json!({ "deployment_id": id }),
                ctx.source_ip.clone(),
            )
            .await;

        info!(deployment_id = id, actor_id = %ctx.actor.id, "Deployment rejected");
        Ok(updated)
    }

    /// Revert a deployed deployment.
    ///
    /// Any per-file failure leaves the record `deployed` and returns
    /// `PartialRollback` with the full per-file report.
    pub async fn rollback(
        &self,
        ctx: &RequestContext,
        id: u64,
    ) -> Result<RollbackOutcome, GateError> {
        self.guard.authorize_mutation(ctx)?;
        let _review = self.lock_deployment(id).await;

        let record = self.store.get(id).await?;
        check_transition(record.status, DeploymentStatus::RolledBack)?;

        let report = match self.engine.rollback(id).await {
            Ok(report) => report,
            Err(e) => {
                self.audit_rollback_failure(ctx, id, json!({ "error": e.to_string() }))
                    .await;
                return Err(e);
            }
        };

        if !report.is_complete() {
            warn!(
                deployment_id = id,
                failed = report.failed.len(),
                "Rollback incomplete, manual intervention required"
            );
            self.audit_rollback_failure(ctx, id, json!({ "failed": report.failed }))
                .await;
            return Err(GateError::PartialRollback(report));
        }

        let updated = self
            .store
            .transition(
                id,
                DeploymentStatus::RolledBack,
                TransitionFields::rolled_back_at(Utc::now()),
            )
            .await?;

        self.guard
            .audit()
            .record(
                &ctx.actor.id,
                AuditAction::DeploymentRolledBack,
                json!({
                    "deployment_id": id,
                    "restored": report.restored.len(),
                    "removed": report.removed.len(),
                }),
                ctx.source_ip.clone(),
            )
            .await;

        info!(deployment_id = id, actor_id = %ctx.actor.id, "Deployment rolled back");
        Ok(RollbackOutcome {
            record: updated,
            report,
        })
    }

    async fn audit_rollback_failure(
        &self,
        ctx: &RequestContext,
        id: u64,
        mut details: serde_json::Value,
    ) {
        details["deployment_id"] = json!(id);
        self.guard
            .audit()
            .record(
                &ctx.actor.id,
                AuditAction::RollbackFailed,
                details,
                ctx.source_ip.clone(),
            )
            .await;
    }

    /// Health snapshot; `secure` is the transport of the asking request
    pub async fn status(&self, secure: bool) -> SystemStatus {
        let roots = self.engine.roots();

        SystemStatus {
            version: version_info().version,
            enabled: self.guard.is_enabled(),
            https: secure,
            writable: DirectoryStatus {
                staging: self.engine.staging().root().is_writable().await,
                themes: Dir::new(&roots.themes).is_writable().await,
                plugins: Dir::new(&roots.plugins).is_writable().await,
                mu_plugins: Dir::new(&roots.mu_plugins).is_writable().await,
            },
            max_file_size: self.limits.max_file_size,
            max_deployment_size: self.limits.max_deployment_size,
            notify_email: self.notifier.is_some(),
        }
    }

    pub async fn audit_entries(&self, limit: usize) -> Vec<AuditEntry> {
        self.guard.audit().recent(limit).await
    }

    /// Remove staging directories older than `older_than_days`
    pub async fn cleanup(&self, older_than_days: u32) -> Result<CleanupReport, GateError> {
        self.engine.cleanup(older_than_days).await
    }
}
