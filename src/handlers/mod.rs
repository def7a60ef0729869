pub mod deploy;
pub mod deployments;

pub use deploy::{handle_auto_deploy, handle_deploy};
pub use deployments::{get_deployment, get_deployment_events, get_deployment_logs};

use crate::error::DeployError;
use crate::shared::ProviderKind;

/// Parse the `{provider}` path segment; unknown providers are a 404
pub(crate) fn parse_provider(segment: &str) -> Result<ProviderKind, DeployError> {
    segment
        .parse()
        .map_err(|_| DeployError::NotFound(format!("provider '{}'", segment)))
}
