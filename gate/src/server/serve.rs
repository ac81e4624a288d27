//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::GateError;
use crate::server::handlers::{
    approve_handler, audit_handler, get_handler, list_handler, reject_handler, rollback_handler,
    status_handler, submit_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/audit", get(audit_handler))
        .route("/deployments", post(submit_handler).get(list_handler))
        .route("/deployments/{id}", get(get_handler))
        .route("/deployments/{id}/approve", post(approve_handler))
        .route("/deployments/{id}/reject", post(reject_handler))
        .route("/deployments/{id}/rollback", post(rollback_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), GateError>>, GateError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GateError::Server(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| GateError::Server(e.to_string()))
    });

    Ok(handle)
}
