//! Deployment service flows: gates, state machine and audit trail

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stagegate::authn::actor::{Actor, RequestContext};
use stagegate::deploy::engine::DeploymentEngine;
use stagegate::deploy::fsm::DeploymentStatus;
use stagegate::deploy::staging::StagingArea;
use stagegate::deploy::targets::TargetRoots;
use stagegate::errors::{AccessDenied, GateError};
use stagegate::guard::audit::{AuditAction, AuditLog};
use stagegate::guard::{AccessGuard, GuardSettings};
use stagegate::models::deployment::{Submission, SubmittedFile};
use stagegate::models::target::SubmittedTarget;
use stagegate::models::validation::FindingCode;
use stagegate::service::DeploymentService;
use stagegate::store::{ListQuery, TableStore};
use stagegate::validate::syntax::BraceBalance;
use stagegate::validate::{ValidationLimits, Validator};
use stagegate::workers::cleanup;

fn roots(base: &Path) -> TargetRoots {
    TargetRoots {
        themes: base.join("themes"),
        plugins: base.join("plugins"),
        mu_plugins: base.join("mu-plugins"),
    }
}

fn service_with(base: &Path, staging_root: &Path, guard: GuardSettings) -> DeploymentService {
    DeploymentService::new(
        Validator::new(Arc::new(BraceBalance)),
        ValidationLimits::default(),
        DeploymentEngine::new(StagingArea::new(staging_root), roots(base)),
        Arc::new(TableStore::in_memory()),
        AccessGuard::new(guard, AuditLog::in_memory(100)),
    )
}

fn service(base: &Path) -> DeploymentService {
    service_with(base, &base.join("staging"), GuardSettings::default())
}

fn admin() -> RequestContext {
    RequestContext::new(Actor::new("1", true))
        .secure(true)
        .source_ip("203.0.113.5")
}

fn hero_banner() -> Submission {
    Submission {
        name: "hero-banner".to_string(),
        description: None,
        target: SubmittedTarget {
            target_type: "theme".to_string(),
            slug: "storefront".to_string(),
        },
        files: vec![SubmittedFile::new("inc/banner.php", "<?php echo 'hi';")],
    }
}

#[tokio::test]
async fn test_hero_banner_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let banner = tmp.path().join("themes/storefront/inc/banner.php");

    let record = service.submit(&admin(), hero_banner()).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Pending);
    assert!(record.validation_result.valid);
    assert!(record.validation_result.warnings.is_empty());
    assert_eq!(record.file_count(), 1);
    assert!(!banner.exists());

    let deployed = service.approve(&admin(), record.id).await.unwrap();
    assert_eq!(deployed.status, DeploymentStatus::Deployed);
    assert_eq!(deployed.reviewed_by.as_deref(), Some("1"));
    assert!(deployed.deployed_at.is_some());
    assert_eq!(fs::read_to_string(&banner).unwrap(), "<?php echo 'hi';");
    let backups = tmp.path().join(format!("staging/{}/backups", record.id));
    assert_eq!(fs::read_dir(backups).unwrap().count(), 0);

    let outcome = service.rollback(&admin(), record.id).await.unwrap();
    assert_eq!(outcome.record.status, DeploymentStatus::RolledBack);
    assert!(outcome.record.rolled_back_at.is_some());
    assert_eq!(outcome.report.removed, vec!["inc/banner.php".to_string()]);
    assert!(!banner.exists());

    let actions: Vec<_> = service
        .audit_entries(10)
        .await
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::DeploymentRolledBack,
            AuditAction::DeploymentApproved,
            AuditAction::DeploymentSubmitted,
        ]
    );
}

#[tokio::test]
async fn test_invalid_submission_creates_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());

    let mut submission = hero_banner();
    submission.name = "   ".to_string();
    submission.files.push(SubmittedFile::new("../../wp-config.php", "<?php"));

    let err = service.submit(&admin(), submission).await.unwrap_err();
    match err {
        GateError::Validation(report) => {
            assert!(report.has_error(FindingCode::InvalidName));
            assert!(report.has_error(FindingCode::InvalidPath));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let page = service.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(service.audit_entries(10).await.is_empty());
}

#[tokio::test]
async fn test_staging_failure_marks_record_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();
    let service = service_with(tmp.path(), &blocker, GuardSettings::default());

    let mut submission = hero_banner();
    submission.files = vec![SubmittedFile::new("inc/x.php", "<?php exec('ls');")];

    let err = service.submit(&admin(), submission).await.unwrap_err();
    assert!(matches!(err, GateError::Filesystem(_)));

    let record = service.get(1).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record
        .validation_result
        .has_error(FindingCode::StagingFailed));
    assert!(record
        .validation_result
        .has_warning(FindingCode::DangerousPattern));
}

#[tokio::test]
async fn test_state_errors_before_filesystem_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let record = service.submit(&admin(), hero_banner()).await.unwrap();

    let err = service.rollback(&admin(), record.id).await.unwrap_err();
    assert!(matches!(
        err,
        GateError::State {
            current: DeploymentStatus::Pending,
            requested: DeploymentStatus::RolledBack
        }
    ));

    service.reject(&admin(), record.id).await.unwrap();
    let err = service.approve(&admin(), record.id).await.unwrap_err();
    assert!(matches!(
        err,
        GateError::State {
            current: DeploymentStatus::Rejected,
            ..
        }
    ));
    assert!(!tmp.path().join("themes").exists());

    let err = service.approve(&admin(), 999).await.unwrap_err();
    assert!(matches!(err, GateError::NotFound(999)));
}

#[tokio::test]
async fn test_apply_failure_marks_record_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let record = service.submit(&admin(), hero_banner()).await.unwrap();

    fs::write(
        tmp.path()
            .join(format!("staging/{}/files/inc/banner.php", record.id)),
        "<?php echo 'changed';",
    )
    .unwrap();

    let err = service.approve(&admin(), record.id).await.unwrap_err();
    assert!(matches!(err, GateError::Integrity { .. }));

    let record = service.get(record.id).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert_eq!(record.reviewed_by.as_deref(), Some("1"));
    assert!(record.deployed_at.is_none());

    let latest = &service.audit_entries(1).await[0];
    assert_eq!(latest.action, AuditAction::DeploymentFailed);
    assert_eq!(latest.source_ip.as_deref(), Some("203.0.113.5"));
}

#[tokio::test]
async fn test_partial_rollback_leaves_record_deployed() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let target = tmp.path().join("themes/storefront");
    fs::create_dir_all(target.join("inc")).unwrap();
    fs::write(target.join("inc/banner.php"), "<?php // before").unwrap();

    let record = service.submit(&admin(), hero_banner()).await.unwrap();
    service.approve(&admin(), record.id).await.unwrap();

    fs::remove_file(target.join("inc/banner.php")).unwrap();
    fs::create_dir_all(target.join("inc/banner.php/blocked")).unwrap();

    let err = service.rollback(&admin(), record.id).await.unwrap_err();
    match err {
        GateError::PartialRollback(report) => {
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].path, "inc/banner.php");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let record = service.get(record.id).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Deployed);
    assert!(record.rolled_back_at.is_none());
    assert_eq!(
        service.audit_entries(1).await[0].action,
        AuditAction::RollbackFailed
    );
}

#[tokio::test]
async fn test_concurrent_approves_apply_once() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let banner = tmp.path().join("themes/storefront/inc/banner.php");
    fs::create_dir_all(banner.parent().unwrap()).unwrap();
    fs::write(&banner, "ORIGINAL").unwrap();

    let record = service.submit(&admin(), hero_banner()).await.unwrap();
    let (admin_a, admin_b) = (admin(), admin());
    let (first, second) = tokio::join!(
        service.approve(&admin_a, record.id),
        service.approve(&admin_b, record.id)
    );

    let (won, lost) = match (first, second) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        (a, b) => panic!("expected exactly one approve to win: {a:?} {b:?}"),
    };
    assert_eq!(won.status, DeploymentStatus::Deployed);
    assert!(matches!(
        lost,
        GateError::State {
            current: DeploymentStatus::Deployed,
            requested: DeploymentStatus::Deployed
        }
    ));

    service.rollback(&admin(), record.id).await.unwrap();
    assert_eq!(fs::read_to_string(&banner).unwrap(), "ORIGINAL");
}

#[tokio::test]
async fn test_concurrent_approve_and_reject_agree_with_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(tmp.path());
    let banner = tmp.path().join("themes/storefront/inc/banner.php");

    let record = service.submit(&admin(), hero_banner()).await.unwrap();
    let (admin_a, admin_b) = (admin(), admin());
    let (approved, rejected) = tokio::join!(
        service.approve(&admin_a, record.id),
        service.reject(&admin_b, record.id)
    );
    assert!(approved.is_ok() != rejected.is_ok());

    let record = service.get(record.id).await.unwrap();
    match record.status {
        DeploymentStatus::Deployed => assert!(banner.exists()),
        DeploymentStatus::Rejected => assert!(!banner.exists()),
        other => panic!("unexpected status {other}"),
    }
}

#[tokio::test]
async fn test_access_gates() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service_with(
        tmp.path(),
        &tmp.path().join("staging"),
        GuardSettings {
            max_requests: 2,
            ..Default::default()
        },
    );

    let viewer = RequestContext::new(Actor::new("5", false)).secure(true);
    let err = service.submit(&viewer, hero_banner()).await.unwrap_err();
    assert!(matches!(err, GateError::Access(AccessDenied::Forbidden(_))));

    let insecure = RequestContext::new(Actor::new("1", true)).host("shop.example.com");
    let err = service.submit(&insecure, hero_banner()).await.unwrap_err();
    assert!(matches!(err, GateError::Access(AccessDenied::InsecureTransport)));

    let local = RequestContext::new(Actor::new("1", true)).host("localhost:8080");
    service.submit(&local, hero_banner()).await.unwrap();
    service.submit(&admin(), hero_banner()).await.unwrap();
    let err = service.submit(&admin(), hero_banner()).await.unwrap_err();
    assert!(matches!(
        err,
        GateError::Access(AccessDenied::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_kill_switch_blocks_mutations_only() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service_with(
        tmp.path(),
        &tmp.path().join("staging"),
        GuardSettings {
            enabled: false,
            ..Default::default()
        },
    );

    let err = service.submit(&admin(), hero_banner()).await.unwrap_err();
    assert!(matches!(err, GateError::Access(AccessDenied::Disabled)));

    assert_eq!(service.list(&ListQuery::default()).await.unwrap().total, 0);
    let status = service.status(true).await;
    assert!(!status.enabled);
    assert_eq!(status.max_file_size, 512_000);
}

#[tokio::test]
async fn test_cleanup_worker_sweeps_expired_staging() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(service(tmp.path()));
    let record = service.submit(&admin(), hero_banner()).await.unwrap();

    // age the manifest past retention
    let staging = service.engine().staging();
    let mut manifest = staging.load_manifest(record.id).await.unwrap();
    manifest.staged_at = Utc::now() - chrono::Duration::days(3);
    staging
        .manifest_file(record.id)
        .write_json(&manifest)
        .await
        .unwrap();

    let options = cleanup::Options {
        interval: Duration::from_millis(5),
        retention_days: 1,
    };
    cleanup::run(
        &options,
        service.as_ref(),
        tokio::time::sleep,
        Box::pin(tokio::time::sleep(Duration::from_millis(200))),
    )
    .await;

    assert!(!tmp
        .path()
        .join(format!("staging/{}", record.id))
        .exists());
}
