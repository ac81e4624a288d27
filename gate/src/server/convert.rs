//! Conversions between domain records and wire models

use std::collections::BTreeMap;

use openapi_server::models::{
    AuditEntryBody, DeploymentResponse, FileBody, FileFailureBody, FindingBody, LimitsBody, Link,
    RollbackSummary, StatusResponse, SubmitRequest, TargetBody, ValidationBody, WritableBody,
};

use crate::deploy::engine::RollbackReport;
use crate::deploy::fsm::DeploymentStatus;
use crate::guard::audit::AuditEntry;
use crate::models::deployment::{ContentEncoding, DeploymentRecord, Submission, SubmittedFile};
use crate::models::target::SubmittedTarget;
use crate::models::validation::{Finding, ValidationReport};
use crate::server::error::ApiError;
use crate::service::SystemStatus;
use crate::utils::format_size;

pub fn submission_from_request(request: SubmitRequest) -> Result<Submission, ApiError> {
    let files = request
        .files
        .into_iter()
        .map(|f| {
            let encoding = match f.encoding.as_str() {
                "" | "utf8" | "utf-8" => ContentEncoding::Utf8,
                "base64" => ContentEncoding::Base64,
                other => {
                    return Err(ApiError::BadRequest(format!(
                        "{}: unknown encoding \"{}\"",
                        f.path, other
                    )))
                }
            };
            Ok(SubmittedFile {
                path: f.path,
                content: f.content,
                encoding,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Submission {
        name: request.name,
        description: request.description,
        target: SubmittedTarget {
            target_type: request.target.target_type,
            slug: request.target.slug,
        },
        files,
    })
}

fn finding_bodies(findings: &[Finding]) -> Vec<FindingBody> {
    findings
        .iter()
        .map(|f| FindingBody {
            code: f.code.to_string(),
            message: f.message.clone(),
        })
        .collect()
}

fn validation_body(report: &ValidationReport) -> ValidationBody {
    ValidationBody {
        valid: report.valid,
        errors: finding_bodies(&report.errors),
        warnings: finding_bodies(&report.warnings),
    }
}

/// Self link plus one link per action the current status allows
pub fn links(record: &DeploymentRecord) -> BTreeMap<String, Link> {
    let base = format!("/deployments/{}", record.id);
    let mut links = BTreeMap::new();
    links.insert("self".to_string(), Link::get(base.clone()));

    for next in record.status.next_states() {
        let action = match next {
            DeploymentStatus::Deployed => "approve",
            DeploymentStatus::Rejected => "reject",
            DeploymentStatus::RolledBack => "rollback",
            _ => continue,
        };
        links.insert(action.to_string(), Link::post(format!("{}/{}", base, action)));
    }
    links
}

pub fn record_to_response(record: &DeploymentRecord, include_files: bool) -> DeploymentResponse {
    let files = include_files.then(|| {
        record
            .files_manifest
            .iter()
            .map(|f| FileBody {
                path: f.path.clone(),
                content: f.content.clone(),
                encoding: match f.encoding {
                    ContentEncoding::Utf8 => "utf8".to_string(),
                    ContentEncoding::Base64 => "base64".to_string(),
                },
            })
            .collect()
    });

    DeploymentResponse {
        id: record.id,
        name: record.name.clone(),
        description: record.description.clone(),
        target: TargetBody {
            target_type: record.target.kind.to_string(),
            slug: record.target.slug.clone(),
        },
        status: record.status.to_string(),
        file_count: record.file_count(),
        validation: validation_body(&record.validation_result),
        files,
        created_by: record.created_by.clone(),
        created_at: record.created_at,
        reviewed_by: record.reviewed_by.clone(),
        reviewed_at: record.reviewed_at,
        deployed_at: record.deployed_at,
        rolled_back_at: record.rolled_back_at,
        links: links(record),
    }
}

pub fn rollback_summary(report: RollbackReport) -> RollbackSummary {
    RollbackSummary {
        restored: report.restored,
        removed: report.removed,
        untouched: report.untouched,
        failed: report
            .failed
            .into_iter()
            .map(|f| FileFailureBody {
                path: f.path,
                error: f.error,
            })
            .collect(),
    }
}

pub fn status_to_response(status: SystemStatus) -> StatusResponse {
    StatusResponse {
        version: status.version,
        enabled: status.enabled,
        https: status.https,
        writable: WritableBody {
            staging: status.writable.staging,
            themes: status.writable.themes,
            plugins: status.writable.plugins,
            mu_plugins: status.writable.mu_plugins,
        },
        limits: LimitsBody {
            max_file_size: status.max_file_size,
            max_file_size_formatted: format_size(status.max_file_size),
            max_deployment_size: status.max_deployment_size,
            max_deployment_size_formatted: format_size(status.max_deployment_size),
        },
        notify_email: status.notify_email,
    }
}

pub fn audit_to_body(entry: AuditEntry) -> AuditEntryBody {
    AuditEntryBody {
        timestamp: entry.timestamp,
        actor_id: entry.actor_id,
        action: entry.action.to_string(),
        details: entry.details,
        source_ip: entry.source_ip,
    }
}
