//! Mapping of service errors onto HTTP responses

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::models::{ErrorResponse, FindingBody};
use tracing::error;

use crate::errors::{AccessDenied, GateError};
use crate::models::validation::Finding;
use crate::server::convert::rollback_summary;

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    Gate(GateError),
    BadRequest(String),
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        ApiError::Gate(err)
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        ApiError::Gate(GateError::Access(err))
    }
}

fn findings(list: Vec<Finding>) -> Vec<FindingBody> {
    list.into_iter()
        .map(|f| FindingBody {
            code: f.code.to_string(),
            message: f.message,
        })
        .collect()
}

impl ApiError {
    fn into_parts(self) -> (StatusCode, ErrorResponse, Option<u64>) {
        let err = match self {
            ApiError::BadRequest(message) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("bad_request", message),
                    None,
                )
            }
            ApiError::Gate(err) => err,
        };

        let message = err.to_string();
        match err {
            GateError::Validation(report) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    errors: Some(findings(report.errors)),
                    warnings: Some(findings(report.warnings)),
                    ..ErrorResponse::new("validation_failed", message)
                },
                None,
            ),
            GateError::State { current, requested } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    current_status: Some(current.to_string()),
                    requested_status: Some(requested.to_string()),
                    ..ErrorResponse::new(
                        "invalid_status",
                        format!("Deployment is currently {}.", current),
                    )
                },
                None,
            ),
            GateError::Access(denied) => {
                let (status, code, retry) = match &denied {
                    AccessDenied::Disabled => {
                        (StatusCode::SERVICE_UNAVAILABLE, "deployments_disabled", None)
                    }
                    AccessDenied::InsecureTransport => {
                        (StatusCode::FORBIDDEN, "https_required", None)
                    }
                    AccessDenied::RateLimited { retry_after } => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "rate_limited",
                        Some(retry_after.as_secs().max(1)),
                    ),
                    AccessDenied::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", None),
                    AccessDenied::Unauthenticated => {
                        (StatusCode::UNAUTHORIZED, "unauthorized", None)
                    }
                };
                (
                    status,
                    ErrorResponse {
                        retry_after: retry,
                        ..ErrorResponse::new(code, denied.to_string())
                    },
                    retry,
                )
            }
            GateError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("not_found", message),
                None,
            ),
            GateError::PartialRollback(report) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    rollback: Some(rollback_summary(report)),
                    ..ErrorResponse::new("rollback_incomplete", message)
                },
                None,
            ),
            GateError::Integrity { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("hash_mismatch", message),
                None,
            ),
            GateError::Filesystem(_) | GateError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("filesystem_error", message),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal_error", message),
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body, retry_after) = self.into_parts();
        if status.is_server_error() {
            error!(code = %body.code, message = %body.message, "Request failed");
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
