//! Deployment models

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::DeploymentStatus;
use crate::models::target::{SubmittedTarget, Target};
use crate::models::validation::ValidationReport;

/// How a submitted file's `content` is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Utf8,
    Base64,
}

/// A file as proposed by the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: ContentEncoding,
}

impl SubmittedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            encoding: ContentEncoding::Utf8,
        }
    }

    pub fn base64(path: impl Into<String>, content: &[u8]) -> Self {
        Self {
            path: path.into(),
            content: BASE64.encode(content),
            encoding: ContentEncoding::Base64,
        }
    }

    /// The raw bytes that will land on disk
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            ContentEncoding::Utf8 => Ok(self.content.as_bytes().to_vec()),
            ContentEncoding::Base64 => BASE64.decode(self.content.trim()),
        }
    }
}

/// A submission as received from the outer layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target: SubmittedTarget,
    pub files: Vec<SubmittedFile>,
}

/// One proposal through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub target: Target,
    pub status: DeploymentStatus,
    pub files_manifest: Vec<SubmittedFile>,
    pub validation_result: ValidationReport,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl DeploymentRecord {
    pub fn file_count(&self) -> usize {
        self.files_manifest.len()
    }
}

/// Fields supplied when creating a record; the store assigns id, status and created_at
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub name: String,
    pub description: String,
    pub target: Target,
    pub files_manifest: Vec<SubmittedFile>,
    pub validation_result: ValidationReport,
    pub created_by: String,
}

/// Extra columns written together with a status change
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub rolled_back_at: Option<DateTime<Utc>>,
    pub validation_result: Option<ValidationReport>,
}

impl TransitionFields {
    pub fn reviewed(actor_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            reviewed_by: Some(actor_id.into()),
            reviewed_at: Some(at),
            ..Default::default()
        }
    }

    pub fn deployed_at(mut self, at: DateTime<Utc>) -> Self {
        self.deployed_at = Some(at);
        self
    }

    pub fn rolled_back_at(at: DateTime<Utc>) -> Self {
        Self {
            rolled_back_at: Some(at),
            ..Default::default()
        }
    }

    pub fn with_validation(mut self, report: ValidationReport) -> Self {
        self.validation_result = Some(report);
        self
    }

    /// Apply onto a record; audit columns are only ever filled once.
    pub fn apply(self, record: &mut DeploymentRecord) {
        if record.reviewed_by.is_none() {
            record.reviewed_by = self.reviewed_by;
        }
        if record.reviewed_at.is_none() {
            record.reviewed_at = self.reviewed_at;
        }
        if record.deployed_at.is_none() {
            record.deployed_at = self.deployed_at;
        }
        if record.rolled_back_at.is_none() {
            record.rolled_back_at = self.rolled_back_at;
        }
        if let Some(report) = self.validation_result {
            record.validation_result = report;
        }
    }
}
