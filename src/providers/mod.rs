//! Hosting provider clients (Vercel, Render)
//!
//! The orchestration core only talks to [`HostingProvider`]; the concrete
//! clients are thin REST wrappers.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::deploy::env::reconcile_env_vars;
use crate::error::DeployError;
use crate::shared::{
    DeployParams, DeployResult, Deployment, DeploymentRef, EnvVar, Project, ProviderKind,
    RemoteEnvVar,
};

pub mod render;
pub mod vercel;

pub use render::RenderClient;
pub use vercel::VercelClient;

/// Operations the deployment core needs from a hosting provider
#[async_trait]
pub trait HostingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Look up a project/service by name
    async fn get_project(&self, name: &str) -> Result<Option<Project>>;

    async fn create_project(&self, params: &DeployParams) -> Result<Project>;

    /// Overwrite every build setting of an existing project with `params`
    async fn update_project_settings(&self, project_id: &str, params: &DeployParams) -> Result<()>;

    async fn list_env_vars(&self, project_id: &str) -> Result<Vec<RemoteEnvVar>>;

    async fn delete_env_var(&self, project_id: &str, env_id: &str) -> Result<()>;

    async fn create_env_var(&self, project_id: &str, env: &EnvVar) -> Result<()>;

    /// Start a deployment of the project's configured branch
    async fn trigger_deployment(&self, project: &Project, params: &DeployParams)
    -> Result<Deployment>;

    /// Fetch a deployment; `None` when the provider does not know it
    async fn get_deployment(&self, deployment: &DeploymentRef) -> Result<Option<Deployment>>;

    /// Build log / event lines for a deployment, oldest first
    async fn get_deployment_events(&self, deployment: &DeploymentRef) -> Result<Vec<String>>;

    /// Whether a deployment status can no longer change
    fn is_terminal(&self, status: &str) -> bool;

    fn dashboard_url(&self, project: &Project, deployment: &Deployment) -> Option<String>;

    fn logs_url(&self, project: &Project, deployment: &Deployment) -> Option<String>;

    /// Default poll budget and interval for this provider
    fn poll_defaults(&self) -> (Duration, Duration) {
        match self.kind() {
            ProviderKind::Vercel => (Duration::from_secs(6 * 60), Duration::from_millis(2500)),
            ProviderKind::Render => (Duration::from_secs(10 * 60), Duration::from_secs(3)),
        }
    }

    /// Create-or-update the project, reconcile env vars, and trigger a deployment
    ///
    /// Safe to repeat against the same project name: an existing project has
    /// all of its settings overwritten before deploying.
    async fn deploy_from_github(&self, params: &DeployParams) -> Result<DeployResult, DeployError> {
        let project = match self.get_project(&params.project_name).await? {
            Some(project) => {
                tracing::debug!(
                    provider = %self.kind(),
                    project = %project.name,
                    "Project exists, updating settings"
                );
                self.update_project_settings(&project.id, params).await?;
                project
            }
            None => {
                let project = self.create_project(params).await?;
                tracing::info!(
                    provider = %self.kind(),
                    project = %project.name,
                    project_id = %project.id,
                    "Created project"
                );
                project
            }
        };

        reconcile_env_vars(self, &project.id, &params.environment_variables).await?;

        let deployment = self.trigger_deployment(&project, params).await?;

        tracing::info!(
            provider = %self.kind(),
            project = %project.name,
            deployment_id = %deployment.id,
            status = %deployment.status,
            "Deployment triggered"
        );

        Ok(DeployResult {
            dashboard_url: self.dashboard_url(&project, &deployment),
            logs_url: self.logs_url(&project, &deployment),
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            deployment_id: deployment.id.clone(),
            url: deployment.url.clone().or_else(|| project.url.clone()),
            status: deployment.status,
            strategy: None,
            retries_used: None,
        })
    }
}

/// Vercel deployment states that no longer change
pub fn is_terminal_vercel_state(state: &str) -> bool {
    matches!(
        state.to_uppercase().as_str(),
        "READY" | "ERROR" | "CANCELED"
    )
}

/// Render deploy statuses that no longer change
pub fn is_terminal_deploy_status(status: &str) -> bool {
    let status = status.to_lowercase();
    ["live", "succeeded", "success", "deployed", "fail", "cancel"]
        .iter()
        .any(|word| status.contains(word))
}

/// Prefix a bare hostname with `https://`
pub(crate) fn https_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
