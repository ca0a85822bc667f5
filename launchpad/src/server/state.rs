//! Server state

use std::sync::Arc;
use std::time::Instant;

use crate::authn::authenticator::Authenticator;
use crate::deploy::service::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub service: Arc<DeploymentService>,
    pub authenticator: Arc<Authenticator>,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(service: Arc<DeploymentService>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            service,
            authenticator,
            started_at: Instant::now(),
        }
    }
}
