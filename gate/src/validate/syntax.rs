//! Syntax checks for server-executed scripts

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::filesys::file::File;

/// Syntax checker trait for testability
#[async_trait]
pub trait SyntaxChecker: Send + Sync {
    /// `Err` carries a message suitable for a finding
    async fn check(&self, source: &str) -> Result<(), String>;
}

/// Counts `{` against `}`; the fallback when no interpreter is available
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceBalance;

#[async_trait]
impl SyntaxChecker for BraceBalance {
    async fn check(&self, source: &str) -> Result<(), String> {
        brace_balance(source)
    }
}

pub fn brace_balance(source: &str) -> Result<(), String> {
    let open = source.matches('{').count();
    let close = source.matches('}').count();
    if open != close {
        return Err(format!(
            "Mismatched braces: {} opening, {} closing.",
            open, close
        ));
    }
    Ok(())
}

/// Runs `php -l` on a temporary copy, falling back to [`BraceBalance`]
#[derive(Debug, Clone)]
pub struct PhpLint {
    binary: String,
}

impl PhpLint {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("stagegate-lint-{}.php", uuid::Uuid::new_v4()))
    }
}

impl Default for PhpLint {
    fn default() -> Self {
        Self::new("php")
    }
}

#[async_trait]
impl SyntaxChecker for PhpLint {
    async fn check(&self, source: &str) -> Result<(), String> {
        let temp = File::new(Self::temp_path());
        if let Err(e) = temp.write_bytes(source.as_bytes()).await {
            warn!("Unable to write lint input, using brace heuristic: {}", e);
            return brace_balance(source);
        }

        let output = Command::new(&self.binary)
            .arg("-l")
            .arg(temp.path())
            .stdin(Stdio::null())
            .output()
            .await;

        if let Err(e) = temp.delete().await {
            warn!("Failed to remove lint input {}: {}", temp.path().display(), e);
        }

        match output {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let mut message = String::from_utf8_lossy(&output.stdout).into_owned();
                message.push_str(&String::from_utf8_lossy(&output.stderr));
                let message = message.replace(&temp.path().display().to_string(), "file");
                Err(format!("PHP syntax error: {}", message.trim()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, using brace heuristic", self.binary);
                brace_balance(source)
            }
            Err(e) => {
                warn!("Failed to run {}: {}, using brace heuristic", self.binary, e);
                brace_balance(source)
            }
        }
    }
}
