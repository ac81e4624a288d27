//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::authn::tokens::ApiTokenConfig;
use crate::deploy::targets::TargetRoots;
use crate::guard::audit::DEFAULT_MAX_ENTRIES;
use crate::guard::GuardSettings;
use crate::logs::LogLevel;
use crate::models::target::TargetType;
use crate::storage::layout::StorageLayout;
use crate::validate::ValidationLimits;

/// Service settings; every field has a default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Kill switch for submit, approve and rollback
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_allowed_targets")]
    pub allowed_targets: Vec<TargetType>,

    /// Bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Bytes, summed over all files of one deployment
    #[serde(default = "default_max_deployment_size")]
    pub max_deployment_size: u64,

    /// Staging retention
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Notify reviewers of new submissions
    #[serde(default)]
    pub notify_email: bool,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Public URL of the managed site
    #[serde(default)]
    pub site_url: Option<String>,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub syntax_check: SyntaxCheckSettings,

    #[serde(default)]
    pub api_tokens: Vec<ApiTokenConfig>,
}

fn default_true() -> bool {
    true
}

fn default_allowed_targets() -> Vec<TargetType> {
    TargetType::ALL.to_vec()
}

fn default_max_file_size() -> u64 {
    512_000
}

fn default_max_deployment_size() -> u64 {
    5_242_880
}

fn default_cleanup_days() -> u32 {
    30
}

fn default_cleanup_interval() -> u64 {
    86_400
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_targets: default_allowed_targets(),
            max_file_size: default_max_file_size(),
            max_deployment_size: default_max_deployment_size(),
            cleanup_days: default_cleanup_days(),
            cleanup_interval_secs: default_cleanup_interval(),
            notify_email: false,
            log_level: LogLevel::Info,
            site_url: None,
            server: ServerSettings::default(),
            paths: PathSettings::default(),
            rate_limit: RateLimitSettings::default(),
            audit: AuditSettings::default(),
            syntax_check: SyntaxCheckSettings::default(),
            api_tokens: Vec::new(),
        }
    }
}

impl Settings {
    pub fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            allowed_targets: self.allowed_targets.clone(),
            max_file_size: self.max_file_size,
            max_deployment_size: self.max_deployment_size,
        }
    }

    pub fn guard(&self) -> GuardSettings {
        GuardSettings {
            enabled: self.enabled,
            site_url: self.site_url.clone(),
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
        }
    }

    pub fn staging_dir(&self, layout: &StorageLayout) -> PathBuf {
        match &self.paths.staging_dir {
            Some(dir) => layout.resolve(dir),
            None => layout.staging_dir().path().to_path_buf(),
        }
    }

    pub fn target_roots(&self, layout: &StorageLayout) -> TargetRoots {
        TargetRoots {
            themes: layout.resolve(&self.paths.themes_dir),
            plugins: layout.resolve(&self.paths.plugins_dir),
            mu_plugins: layout.resolve(&self.paths.mu_plugins_dir),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(60))
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Filesystem locations; relative paths are resolved against the base dir
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    #[serde(default = "default_themes_dir")]
    pub themes_dir: PathBuf,

    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,

    #[serde(default = "default_mu_plugins_dir")]
    pub mu_plugins_dir: PathBuf,
}

fn default_themes_dir() -> PathBuf {
    PathBuf::from("site/themes")
}

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("site/plugins")
}

fn default_mu_plugins_dir() -> PathBuf {
    PathBuf::from("site/mu-plugins")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            staging_dir: None,
            themes_dir: default_themes_dir(),
            plugins_dir: default_plugins_dir(),
            mu_plugins_dir: default_mu_plugins_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxCheckSettings {
    /// Interpreter used for `-l`; falls back to a brace count when missing
    #[serde(default = "default_php_binary")]
    pub php_binary: String,
}

fn default_php_binary() -> String {
    "php".to_string()
}

impl Default for SyntaxCheckSettings {
    fn default() -> Self {
        Self {
            php_binary: default_php_binary(),
        }
    }
}
