//! Validation findings

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable finding code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    InvalidName,
    InvalidTargetType,
    InvalidTargetSlug,
    NoFiles,
    InvalidPath,
    InvalidFileType,
    InvalidEncoding,
    FileTooLarge,
    PhpSyntaxError,
    DangerousPattern,
    DeploymentTooLarge,
    StagingFailed,
}

impl FindingCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::InvalidName => "invalid_name",
            FindingCode::InvalidTargetType => "invalid_target_type",
            FindingCode::InvalidTargetSlug => "invalid_target_slug",
            FindingCode::NoFiles => "no_files",
            FindingCode::InvalidPath => "invalid_path",
            FindingCode::InvalidFileType => "invalid_file_type",
            FindingCode::InvalidEncoding => "invalid_encoding",
            FindingCode::FileTooLarge => "file_too_large",
            FindingCode::PhpSyntaxError => "php_syntax_error",
            FindingCode::DangerousPattern => "dangerous_pattern",
            FindingCode::DeploymentTooLarge => "deployment_too_large",
            FindingCode::StagingFailed => "staging_failed",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    pub message: String,
}

impl Finding {
    pub fn new(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Complete validation outcome; `valid` holds iff `errors` is empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new(errors: Vec<Finding>, warnings: Vec<Finding>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn has_error(&self, code: FindingCode) -> bool {
        self.errors.iter().any(|f| f.code == code)
    }

    pub fn has_warning(&self, code: FindingCode) -> bool {
        self.warnings.iter().any(|f| f.code == code)
    }

    /// Add an error after the fact, keeping `valid` consistent.
    pub fn push_error(&mut self, finding: Finding) {
        self.errors.push(finding);
        self.valid = false;
    }
}
