//! Server state

use std::sync::Arc;

use crate::authn::tokens::ApiTokens;
use crate::service::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub service: Arc<DeploymentService>,
    pub tokens: Arc<ApiTokens>,
}

impl ServerState {
    pub fn new(service: Arc<DeploymentService>, tokens: Arc<ApiTokens>) -> Self {
        Self { service, tokens }
    }
}
