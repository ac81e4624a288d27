//! HTTP surface: authentication, status codes and response shapes

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use stagegate::authn::tokens::{ApiTokenConfig, ApiTokens};
use stagegate::deploy::engine::DeploymentEngine;
use stagegate::deploy::staging::StagingArea;
use stagegate::deploy::targets::TargetRoots;
use stagegate::guard::audit::AuditLog;
use stagegate::guard::{AccessGuard, GuardSettings};
use stagegate::server::serve::router;
use stagegate::server::state::ServerState;
use stagegate::service::DeploymentService;
use stagegate::store::TableStore;
use stagegate::validate::syntax::BraceBalance;
use stagegate::validate::{ValidationLimits, Validator};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";
const VIEWER_TOKEN: &str = "viewer-token";

fn app(base: &Path) -> Router {
    let service = DeploymentService::new(
        Validator::new(Arc::new(BraceBalance)),
        ValidationLimits::default(),
        DeploymentEngine::new(
            StagingArea::new(base.join("staging")),
            TargetRoots {
                themes: base.join("themes"),
                plugins: base.join("plugins"),
                mu_plugins: base.join("mu-plugins"),
            },
        ),
        Arc::new(TableStore::in_memory()),
        AccessGuard::new(GuardSettings::default(), AuditLog::in_memory(100)),
    );
    let tokens = ApiTokens::new(&[
        ApiTokenConfig {
            token: ADMIN_TOKEN.to_string(),
            actor_id: "1".to_string(),
            privileged: true,
        },
        ApiTokenConfig {
            token: VIEWER_TOKEN.to_string(),
            actor_id: "7".to_string(),
            privileged: false,
        },
    ]);
    router(Arc::new(ServerState::new(
        Arc::new(service),
        Arc::new(tokens),
    )))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-proto", "https");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn hero_banner() -> Value {
    json!({
        "name": "hero-banner",
        "target": {"type": "theme", "slug": "storefront"},
        "files": [{"path": "inc/banner.php", "content": "<?php echo 'hi';"}]
    })
}

async fn submit(app: &Router) -> u64 {
    let response = send(
        app,
        request("POST", "/deployments", Some(ADMIN_TOKEN), Some(hero_banner())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let response = send(&app, request("GET", "/deployments", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "unauthorized");

    let response = send(&app, request("GET", "/deployments", Some("nope"), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submit_returns_pending_record_with_links() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let response = send(
        &app,
        request("POST", "/deployments", Some(ADMIN_TOKEN), Some(hero_banner())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["target"]["type"], "theme");
    assert_eq!(body["file_count"], 1);
    assert_eq!(body["validation"]["valid"], true);
    assert!(body.get("files").is_none());
    assert_eq!(body["_links"]["self"]["href"], "/deployments/1");
    assert_eq!(body["_links"]["approve"]["method"], "POST");
    assert!(body["_links"].get("rollback").is_none());
}

#[tokio::test]
async fn test_invalid_submission_is_unprocessable() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let body = json!({
        "name": "bad",
        "target": {"type": "theme", "slug": "storefront"},
        "files": [{"path": "../wp-config.php", "content": "<?php"}]
    });
    let response = send(
        &app,
        request("POST", "/deployments", Some(ADMIN_TOKEN), Some(body)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["errors"][0]["code"], "invalid_path");

    let response = send(&app, request("GET", "/deployments", Some(ADMIN_TOKEN), None)).await;
    assert_eq!(response.headers()["x-total-count"], "0");
}

#[tokio::test]
async fn test_unknown_encoding_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let body = json!({
        "name": "odd",
        "target": {"type": "plugin", "slug": "shop"},
        "files": [{"path": "shop.php", "content": "<?php", "encoding": "rot13"}]
    });
    let response = send(
        &app,
        request("POST", "/deployments", Some(ADMIN_TOKEN), Some(body)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_conflict_and_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let id = submit(&app).await;

    let response = send(
        &app,
        request("POST", &format!("/deployments/{id}/reject"), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "rejected");

    let response = send(
        &app,
        request("POST", &format!("/deployments/{id}/approve"), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_status");
    assert_eq!(body["current_status"], "rejected");
    assert_eq!(body["requested_status"], "deployed");

    let response = send(&app, request("GET", "/deployments/42", Some(ADMIN_TOKEN), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plain_http_to_remote_host_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let req = Request::builder()
        .method("POST")
        .uri("/deployments")
        .header(header::HOST, "shop.example.com")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(hero_banner().to_string()))
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "https_required");

    let req = Request::builder()
        .method("POST")
        .uri("/deployments")
        .header(header::HOST, "localhost:8787")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(hero_banner().to_string()))
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_viewer_cannot_mutate_or_read_audit() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let id = submit(&app).await;

    let response = send(
        &app,
        request("POST", &format!("/deployments/{id}/approve"), Some(VIEWER_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "forbidden");

    let response = send(&app, request("GET", "/audit", Some(VIEWER_TOKEN), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, request("GET", &format!("/deployments/{id}"), Some(VIEWER_TOKEN), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_paging_headers_and_filters() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    for _ in 0..3 {
        submit(&app).await;
    }

    let response = send(
        &app,
        request("GET", "/deployments?per_page=2&order=asc&orderby=id", Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "3");
    assert_eq!(response.headers()["x-total-pages"], "2");
    let body = json_body(response).await;
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let response = send(
        &app,
        request("GET", "/deployments?status=deployed", Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.headers()["x-total-count"], "0");

    let response = send(
        &app,
        request("GET", "/deployments?status=shipped", Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_includes_files_on_request() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let id = submit(&app).await;

    let response = send(
        &app,
        request("GET", &format!("/deployments/{id}?include_files=true"), Some(ADMIN_TOKEN), None),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["files"][0]["path"], "inc/banner.php");
    assert_eq!(body["files"][0]["content"], "<?php echo 'hi';");
    assert_eq!(body["files"][0]["encoding"], "utf8");
}

#[tokio::test]
async fn test_approve_then_rollback_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let id = submit(&app).await;
    let banner = tmp.path().join("themes/storefront/inc/banner.php");

    let response = send(
        &app,
        request("POST", &format!("/deployments/{id}/approve"), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "deployed");
    assert!(body["_links"].get("rollback").is_some());
    assert!(banner.exists());

    let response = send(
        &app,
        request("POST", &format!("/deployments/{id}/rollback"), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["deployment"]["status"], "rolled_back");
    assert_eq!(body["rollback"]["removed"][0], "inc/banner.php");
    assert!(!banner.exists());

    let response = send(&app, request("GET", "/audit?limit=2", Some(ADMIN_TOKEN), None)).await;
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["action"], "deployment_rolled_back");
}

#[tokio::test]
async fn test_status_reports_limits_and_transport() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let response = send(&app, request("GET", "/status", Some(VIEWER_TOKEN), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["https"], true);
    assert_eq!(body["limits"]["max_file_size"], 512_000);
    assert_eq!(body["writable"]["themes"], false);
}
