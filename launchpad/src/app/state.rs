//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::authenticator::Authenticator;
use crate::deploy::git::GitCli;
use crate::deploy::platform::RailwayCli;
use crate::deploy::service::DeploymentService;
use crate::errors::LaunchpadError;

/// Main application state
pub struct AppState {
    /// Deployment engine
    pub service: Arc<DeploymentService>,

    /// API login and token validation
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, LaunchpadError> {
        info!("Initializing application state...");

        let authenticator = Arc::new(Authenticator::new(&options.auth)?);

        let deployments = &options.deployments;
        let source_control = Arc::new(GitCli::new(deployments.git_binary.clone()));
        let platform = Arc::new(RailwayCli::new(
            deployments.platform_binary.clone(),
            deployments.platform_install_command.clone(),
        ));
        let service = Arc::new(DeploymentService::new(
            deployments,
            source_control,
            platform,
        ));
        service.init().await?;

        Ok(Self {
            service,
            authenticator,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) {
        info!("Shutting down application state...");
        self.service.shutdown().await;
    }
}
