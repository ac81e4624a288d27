//! Structural and security gate over a proposed file set
//!
//! The validator never fails fast: every file is inspected and every finding
//! is collected so the submitter sees the whole picture in one pass.

pub mod patterns;
pub mod rules;
pub mod syntax;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::deploy::manifest::relative_path;
use crate::models::deployment::SubmittedFile;
use crate::models::target::{is_valid_slug, TargetType};
use crate::models::validation::{Finding, FindingCode, ValidationReport};
use crate::utils::format_size;
use crate::validate::syntax::{PhpLint, SyntaxChecker};

/// Configured limits the validator checks against
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub allowed_targets: Vec<TargetType>,
    pub max_file_size: u64,
    pub max_deployment_size: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            allowed_targets: TargetType::ALL.to_vec(),
            max_file_size: 512_000,
            max_deployment_size: 5_242_880,
        }
    }
}

/// File-set validator
#[derive(Clone)]
pub struct Validator {
    syntax: Arc<dyn SyntaxChecker>,
}

impl Validator {
    pub fn new(syntax: Arc<dyn SyntaxChecker>) -> Self {
        Self { syntax }
    }

    pub fn with_php_binary(binary: impl Into<String>) -> Self {
        Self::new(Arc::new(PhpLint::new(binary)))
    }

    /// Validate a proposed deployment and report every finding
    pub async fn validate(
        &self,
        files: &[SubmittedFile],
        target_type: &str,
        target_slug: &str,
        limits: &ValidationLimits,
    ) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let type_allowed = target_type
            .parse::<TargetType>()
            .map(|kind| limits.allowed_targets.contains(&kind))
            .unwrap_or(false);
        if !type_allowed {
            errors.push(Finding::new(
                FindingCode::InvalidTargetType,
                format!("Target type \"{}\" is not allowed.", target_type),
            ));
        }

        if !is_valid_slug(target_slug) {
            errors.push(Finding::new(
                FindingCode::InvalidTargetSlug,
                "Target slug must contain only alphanumeric characters, hyphens, and underscores.",
            ));
        }

        if files.is_empty() {
            errors.push(Finding::new(
                FindingCode::NoFiles,
                "No files provided in the deployment.",
            ));
        }

        let mut total_size: u64 = 0;
        let mut seen = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            let label = if file.path.is_empty() {
                format!("file[{}]", index)
            } else {
                file.path.clone()
            };

            if let Err(reason) = rules::check_path(&file.path) {
                errors.push(Finding::new(
                    FindingCode::InvalidPath,
                    format!("{}: {}", label, reason),
                ));
                continue;
            }

            // `a.css` and `./a.css` stage to the same file
            let duplicate = match relative_path(&file.path) {
                Ok(rel) => !seen.insert(rel),
                Err(_) => false,
            };
            if duplicate {
                errors.push(Finding::new(
                    FindingCode::InvalidPath,
                    format!("{}: Path appears more than once in the deployment.", label),
                ));
                continue;
            }

            if let Err(reason) = rules::check_file_type(&file.path) {
                errors.push(Finding::new(
                    FindingCode::InvalidFileType,
                    format!("{}: {}", label, reason),
                ));
                continue;
            }

            let bytes = match file.decode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    errors.push(Finding::new(
                        FindingCode::InvalidEncoding,
                        format!("{}: content is not valid base64: {}", label, e),
                    ));
                    continue;
                }
            };

            let size = bytes.len() as u64;
            if size > limits.max_file_size {
                errors.push(Finding::new(
                    FindingCode::FileTooLarge,
                    format!(
                        "{}: File size ({}) exceeds the maximum allowed ({}).",
                        label,
                        format_size(size),
                        format_size(limits.max_file_size)
                    ),
                ));
            }
            total_size += size;

            if rules::is_script(&file.path) {
                let source = String::from_utf8_lossy(&bytes);

                if let Err(message) = self.syntax.check(&source).await {
                    errors.push(Finding::new(
                        FindingCode::PhpSyntaxError,
                        format!("{}: {}", label, message),
                    ));
                }

                for message in patterns::scan(&source) {
                    warnings.push(Finding::new(
                        FindingCode::DangerousPattern,
                        format!("{}: {}", label, message),
                    ));
                }
            }
        }

        if total_size > limits.max_deployment_size {
            errors.push(Finding::new(
                FindingCode::DeploymentTooLarge,
                format!(
                    "Total deployment size ({}) exceeds the maximum allowed ({}).",
                    format_size(total_size),
                    format_size(limits.max_deployment_size)
                ),
            ));
        }

        debug!(
            files = files.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            "Validation finished"
        );

        ValidationReport::new(errors, warnings)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Arc::new(PhpLint::default()))
    }
}
