//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::cleanup;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Enable the HTTP server
    pub enable_server: bool,

    /// Enable the staging cleanup worker
    pub enable_cleanup_worker: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Cleanup worker options
    pub cleanup_worker: cleanup::Options,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            layout: StorageLayout::default(),
            enable_server: true,
            enable_cleanup_worker: true,
            server: ServerOptions::default(),
            cleanup_worker: cleanup::Options::default(),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

impl AppOptions {
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        Self {
            layout,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            cleanup_worker: cleanup::Options {
                interval: settings.cleanup_interval(),
                retention_days: settings.cleanup_days,
            },
            ..Default::default()
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}
