//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::authn::tokens::ApiTokens;
use crate::deploy::engine::DeploymentEngine;
use crate::deploy::staging::StagingArea;
use crate::errors::GateError;
use crate::guard::audit::AuditLog;
use crate::guard::AccessGuard;
use crate::service::notify::LogNotifier;
use crate::service::DeploymentService;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::store::TableStore;
use crate::validate::Validator;

/// Main application state
pub struct AppState {
    pub service: Arc<DeploymentService>,
    pub tokens: Arc<ApiTokens>,
}

impl AppState {
    /// Build every component once from the settings
    pub async fn init(layout: &StorageLayout, settings: &Settings) -> Result<Self, GateError> {
        info!("Initializing application state...");

        layout.setup().await?;

        let staging = StagingArea::new(settings.staging_dir(layout));
        staging.init().await?;
        let engine = DeploymentEngine::new(staging, settings.target_roots(layout));

        let store = Arc::new(TableStore::open(layout.deployments_file()).await?);
        let audit = AuditLog::open(layout.audit_file(), settings.audit.max_entries).await?;
        let guard = AccessGuard::new(settings.guard(), audit);
        let validator = Validator::with_php_binary(settings.syntax_check.php_binary.clone());

        let mut service =
            DeploymentService::new(validator, settings.limits(), engine, store, guard);
        if settings.notify_email {
            service = service.with_notifier(Arc::new(LogNotifier));
        }

        let tokens = ApiTokens::new(&settings.api_tokens);
        if tokens.is_empty() {
            warn!("No API tokens configured; every request will be refused");
        }

        Ok(Self {
            service: Arc::new(service),
            tokens: Arc::new(tokens),
        })
    }
}
