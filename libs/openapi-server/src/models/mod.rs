//! API request and response bodies

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Destination of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBody {
    #[serde(rename = "type")]
    pub target_type: String,
    pub slug: String,
}

/// A file as submitted or returned with `include_files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBody {
    pub path: String,
    pub content: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    "utf8".to_string()
}

/// Submit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target: TargetBody,
    pub files: Vec<FileBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationBody {
    pub valid: bool,
    pub errors: Vec<FindingBody>,
    pub warnings: Vec<FindingBody>,
}

/// Hypermedia link to a related action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub method: String,
}

impl Link {
    pub fn get(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            method: "GET".to_string(),
        }
    }

    pub fn post(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            method: "POST".to_string(),
        }
    }
}

/// Deployment representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResponse {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub target: TargetBody,
    pub status: String,
    pub file_count: usize,
    pub validation: ValidationBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileBody>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub rolled_back_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailureBody {
    pub path: String,
    pub error: String,
}

/// Per-file outcome of a rollback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackSummary {
    pub restored: Vec<String>,
    pub removed: Vec<String>,
    pub untouched: Vec<String>,
    pub failed: Vec<FileFailureBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackResponse {
    pub deployment: DeploymentResponse,
    pub rollback: RollbackSummary,
}

/// Error body; optional fields are filled depending on the error class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FindingBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<FindingBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritableBody {
    pub staging: bool,
    pub themes: bool,
    pub plugins: bool,
    pub mu_plugins: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsBody {
    pub max_file_size: u64,
    pub max_file_size_formatted: String,
    pub max_deployment_size: u64,
    pub max_deployment_size_formatted: String,
}

/// Status/health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub enabled: bool,
    pub https: bool,
    pub writable: WritableBody,
    pub limits: LimitsBody,
    pub notify_email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryBody {
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub action: String,
    pub details: Value,
    pub source_ip: Option<String>,
}
