//! Periodic staging cleanup worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::service::DeploymentService;

/// Cleanup worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Time between sweeps
    pub interval: Duration,

    /// Staging directories older than this are removed
    pub retention_days: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(86_400),
            retention_days: 30,
        }
    }
}

/// Run the cleanup worker until `shutdown_signal` resolves
pub async fn run<S, F>(
    options: &Options,
    service: &DeploymentService,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Cleanup worker starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Cleanup worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        debug!("Sweeping staging directories...");
        match service.cleanup(options.retention_days).await {
            Ok(report) if !report.removed.is_empty() => {
                info!(removed = report.removed.len(), "Removed expired staging directories");
            }
            Ok(_) => {}
            Err(e) => error!("Staging cleanup failed: {}", e),
        }
    }
}
