//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    Json,
};
use openapi_server::models::{
    AuditEntryBody, DeploymentResponse, RollbackResponse, StatusResponse, SubmitRequest,
};
use serde::Deserialize;

use crate::deploy::fsm::DeploymentStatus;
use crate::models::target::TargetType;
use crate::server::context::Caller;
use crate::server::convert::{
    audit_to_body, record_to_response, rollback_summary, status_to_response,
    submission_from_request,
};
use crate::server::error::ApiError;
use crate::server::state::ServerState;
use crate::store::{ListQuery, SortColumn, SortOrder, DEFAULT_PER_PAGE};

pub const DEFAULT_AUDIT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub target_type: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub orderby: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let status = self
            .status
            .map(|s| s.parse::<DeploymentStatus>())
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let target_type = self
            .target_type
            .map(|t| t.parse::<TargetType>())
            .transpose()
            .map_err(ApiError::BadRequest)?;

        Ok(ListQuery {
            status,
            target_type,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE),
            orderby: SortColumn::from_param(self.orderby.as_deref()),
            order: SortOrder::from_param(self.order.as_deref()),
        }
        .clamped())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
    #[serde(default)]
    pub include_files: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub limit: Option<usize>,
}

/// Submit a deployment for review
pub async fn submit_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<DeploymentResponse>), ApiError> {
    let submission = submission_from_request(request)?;
    let record = state.service.submit(&ctx, submission).await?;
    Ok((StatusCode::CREATED, Json(record_to_response(&record, false))))
}

/// List deployments with paging metadata in headers
pub async fn list_handler(
    State(state): State<Arc<ServerState>>,
    Caller(_ctx): Caller,
    Query(params): Query<ListParams>,
) -> Result<(HeaderMap, Json<Vec<DeploymentResponse>>), ApiError> {
    let query = params.into_query()?;
    let page = state.service.list(&query).await?;

    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(page.total));
    headers.insert("x-total-pages", HeaderValue::from(page.page_count));

    let items = page
        .items
        .iter()
        .map(|r| record_to_response(r, false))
        .collect();
    Ok((headers, Json(items)))
}

pub async fn get_handler(
    State(state): State<Arc<ServerState>>,
    Caller(_ctx): Caller,
    Path(id): Path<u64>,
    Query(params): Query<GetParams>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state.service.get(id).await?;
    Ok(Json(record_to_response(&record, params.include_files)))
}

pub async fn approve_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state.service.approve(&ctx, id).await?;
    Ok(Json(record_to_response(&record, false)))
}

pub async fn reject_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state.service.reject(&ctx, id).await?;
    Ok(Json(record_to_response(&record, false)))
}

pub async fn rollback_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<Json<RollbackResponse>, ApiError> {
    let outcome = state.service.rollback(&ctx, id).await?;
    Ok(Json(RollbackResponse {
        deployment: record_to_response(&outcome.record, false),
        rollback: rollback_summary(outcome.report),
    }))
}

pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
) -> Json<StatusResponse> {
    let status = state.service.status(ctx.secure).await;
    Json(status_to_response(status))
}

/// Recent audit entries, newest first; privileged callers only
pub async fn audit_handler(
    State(state): State<Arc<ServerState>>,
    Caller(ctx): Caller,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEntryBody>>, ApiError> {
    state.service.guard().require_privileged(&ctx)?;

    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, 1000);
    let entries = state
        .service
        .audit_entries(limit)
        .await
        .into_iter()
        .map(audit_to_body)
        .collect();
    Ok(Json(entries))
}
