//! Error types for the deployment gate

use std::time::Duration;

use thiserror::Error;

use crate::deploy::fsm::DeploymentStatus;
use crate::deploy::engine::RollbackReport;
use crate::models::validation::ValidationReport;

/// Main error type for the deployment gate
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Validation failed: {} error(s), {} warning(s)", .0.errors.len(), .0.warnings.len())]
    Validation(ValidationReport),

    #[error("Invalid status transition: {current} -> {requested}")]
    State {
        current: DeploymentStatus,
        requested: DeploymentStatus,
    },

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hash mismatch after writing {path}: expected {expected}, got {actual}")]
    Integrity {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Access denied: {0}")]
    Access(#[from] AccessDenied),

    #[error("Rollback incomplete: {} of {} file(s) failed", .0.failed.len(), .0.total())]
    PartialRollback(RollbackReport),

    #[error("Deployment not found: {0}")]
    NotFound(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by callers to apply the propagation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Filesystem,
    Integrity,
    Access,
    NotFound,
    Other,
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Validation(_) => ErrorKind::Validation,
            GateError::State { .. } => ErrorKind::State,
            GateError::Filesystem(_) | GateError::Io(_) | GateError::PartialRollback(_) => {
                ErrorKind::Filesystem
            }
            GateError::Integrity { .. } => ErrorKind::Integrity,
            GateError::Access(_) => ErrorKind::Access,
            GateError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }

    /// Filesystem and integrity failures abort the running operation the same way.
    pub fn is_fatal_io(&self) -> bool {
        matches!(self.kind(), ErrorKind::Filesystem | ErrorKind::Integrity)
    }
}

/// Reasons a request is refused before any filesystem effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("deployments are currently disabled")]
    Disabled,

    #[error("HTTPS is required")]
    InsecureTransport,

    #[error("rate limit exceeded, retry in {}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    #[error("actor {0} is not allowed to perform this operation")]
    Forbidden(String),

    #[error("missing or unknown credentials")]
    Unauthenticated,
}
