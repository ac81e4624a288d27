//! Staging, apply and rollback against a real filesystem

use std::fs;
use std::path::Path;

use stagegate::deploy::engine::DeploymentEngine;
use stagegate::deploy::staging::StagingArea;
use stagegate::deploy::targets::TargetRoots;
use stagegate::errors::{ErrorKind, GateError};
use stagegate::models::deployment::SubmittedFile;
use stagegate::models::target::{Target, TargetType};

fn engine(base: &Path) -> DeploymentEngine {
    DeploymentEngine::new(
        StagingArea::new(base.join("staging")),
        TargetRoots {
            themes: base.join("themes"),
            plugins: base.join("plugins"),
            mu_plugins: base.join("mu-plugins"),
        },
    )
}

fn theme() -> Target {
    Target::new(TargetType::Theme, "storefront")
}

#[tokio::test]
async fn test_new_files_no_backup_and_rollback_deletes() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    let files = vec![
        SubmittedFile::new("inc/banner.php", "<?php echo 'hi';"),
        SubmittedFile::new("assets/banner.css", ".banner{}"),
    ];

    engine.staging().stage(1, &files, &theme()).await.unwrap();
    let report = engine.execute(1).await.unwrap();

    assert!(report.backed_up.is_empty());
    assert_eq!(report.applied.len(), 2);
    let target = tmp.path().join("themes/storefront");
    assert_eq!(
        fs::read_to_string(target.join("inc/banner.php")).unwrap(),
        "<?php echo 'hi';"
    );
    let backups = tmp.path().join("staging/1/backups");
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 0);

    let report = engine.rollback(1).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.removed.len(), 2);
    assert!(!target.join("inc/banner.php").exists());
    assert!(!target.join("assets/banner.css").exists());
}

#[tokio::test]
async fn test_overwrite_then_rollback_restores_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    let target = tmp.path().join("plugins/shop-tools");
    fs::create_dir_all(target.join("inc")).unwrap();
    let original: Vec<u8> = (0u8..=255).collect();
    fs::write(target.join("inc/data.json"), &original).unwrap();

    let files = vec![
        SubmittedFile::new("inc/data.json", "{\"v\":2}"),
        SubmittedFile::new("readme.txt", "new"),
    ];
    let plugin = Target::new(TargetType::Plugin, "shop-tools");
    engine.staging().stage(4, &files, &plugin).await.unwrap();

    let report = engine.execute(4).await.unwrap();
    assert_eq!(report.backed_up, vec!["inc/data.json".to_string()]);
    assert_eq!(
        fs::read(tmp.path().join("staging/4/backups/inc/data.json")).unwrap(),
        original
    );
    assert_eq!(
        fs::read_to_string(target.join("inc/data.json")).unwrap(),
        "{\"v\":2}"
    );

    let report = engine.rollback(4).await.unwrap();
    assert_eq!(report.restored, vec!["inc/data.json".to_string()]);
    assert_eq!(report.removed, vec!["readme.txt".to_string()]);
    assert_eq!(fs::read(target.join("inc/data.json")).unwrap(), original);
    assert!(!target.join("readme.txt").exists());
}

#[tokio::test]
async fn test_execute_without_manifest_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());

    let err = engine.execute(42).await.unwrap_err();
    assert!(matches!(err, GateError::Filesystem(_)));
    assert!(!tmp.path().join("themes").exists());
    assert!(!tmp.path().join("plugins").exists());
    assert!(!tmp.path().join("mu-plugins").exists());

    let err = engine.rollback(42).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filesystem);
}

#[tokio::test]
async fn test_tampered_staging_is_an_integrity_error() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    let files = vec![
        SubmittedFile::new("a.txt", "first"),
        SubmittedFile::new("b.txt", "second"),
    ];
    engine.staging().stage(2, &files, &theme()).await.unwrap();
    fs::write(tmp.path().join("staging/2/files/b.txt"), "tampered").unwrap();

    let err = engine.execute(2).await.unwrap_err();
    assert!(err.is_fatal_io());
    match err {
        GateError::Integrity { path, .. } => assert_eq!(path, "b.txt"),
        other => panic!("unexpected error: {other:?}"),
    }

    // not transactional: the first file stays written
    let target = tmp.path().join("themes/storefront");
    assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "first");
}

#[tokio::test]
async fn test_rollback_reports_per_file_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    let target = tmp.path().join("themes/storefront");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("style.css"), "old style").unwrap();
    fs::write(target.join("functions.php"), "<?php // old").unwrap();

    let files = vec![
        SubmittedFile::new("style.css", "new style"),
        SubmittedFile::new("functions.php", "<?php // new"),
    ];
    engine.staging().stage(3, &files, &theme()).await.unwrap();
    engine.execute(3).await.unwrap();

    // something outside the gate replaced a file with a directory
    fs::remove_file(target.join("style.css")).unwrap();
    fs::create_dir_all(target.join("style.css/nested")).unwrap();

    let report = engine.rollback(3).await.unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.total(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "style.css");
    assert_eq!(report.restored, vec!["functions.php".to_string()]);
    assert_eq!(
        fs::read_to_string(target.join("functions.php")).unwrap(),
        "<?php // old"
    );
}

#[tokio::test]
async fn test_mu_plugin_lands_in_mu_root() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    let target = Target::new(TargetType::MuPlugin, "loader");

    engine
        .staging()
        .stage(5, &[SubmittedFile::new("loader.php", "<?php")], &target)
        .await
        .unwrap();
    engine.execute(5).await.unwrap();

    assert!(tmp.path().join("mu-plugins/loader.php").is_file());
    assert!(!tmp.path().join("mu-plugins/loader").exists());
}

#[tokio::test]
async fn test_cleanup_keeps_fresh_staging() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine(tmp.path());
    engine
        .staging()
        .stage(6, &[SubmittedFile::new("a.txt", "x")], &theme())
        .await
        .unwrap();

    let report = engine.cleanup(30).await.unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(report.kept, 1);
    assert!(tmp.path().join("staging/6/manifest.json").exists());
}
