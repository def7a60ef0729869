use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::deploy::{AbortSignal, PollOptions, base_params, poll_deployment, run_deploy};
use crate::error::DeployError;
use crate::handlers::parse_provider;
use crate::providers::HostingProvider;
use crate::server::AppState;
use crate::shared::{DeployRequest, DeployResult, DeploymentRef, spawn_logged};

/// Deploy a repository, retrying with simplified strategies on failure
pub async fn handle_deploy(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<DeployResult>, DeployError> {
    let kind = parse_provider(&provider)?;
    let Json(request) = payload?;
    // Validate before touching any provider
    base_params(&request)?;
    let provider = state.provider(kind)?;

    tracing::info!(
        provider = %kind,
        repository = %request.repository,
        retry = request.enable_retry,
        "Received deploy request"
    );

    let result = run_deploy(state.github.as_ref(), provider.as_ref(), &request).await?;

    Ok(Json(result))
}

/// Request to redeploy a repository with default settings
#[derive(Debug, Deserialize)]
pub struct AutoDeployRequest {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoDeployResponse {
    pub deployed: bool,
    pub auto_deployed: bool,
    /// Whether the project existed before this deploy
    pub existed: bool,
    #[serde(flatten)]
    pub result: DeployResult,
}

/// Deploy with auto-detected settings, reporting whether the project already existed
pub async fn handle_auto_deploy(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    payload: Result<Json<AutoDeployRequest>, JsonRejection>,
) -> Result<Json<AutoDeployResponse>, DeployError> {
    let kind = parse_provider(&provider)?;
    let Json(request) = payload?;
    let deploy_request = DeployRequest {
        branch: request.branch,
        ..DeployRequest::new(request.repository)
    };
    let params = base_params(&deploy_request)?;
    let provider = state.provider(kind)?;

    let existed = provider.get_project(&params.project_name).await?.is_some();

    tracing::info!(
        provider = %kind,
        repository = %params.repository,
        project = %params.project_name,
        existed,
        "Auto-deploying repository"
    );

    let result = run_deploy(state.github.as_ref(), provider.as_ref(), &deploy_request).await?;

    watch_in_background(
        provider,
        DeploymentRef::with_service(&result.deployment_id, &result.project_id),
    );

    Ok(Json(AutoDeployResponse {
        deployed: true,
        auto_deployed: true,
        existed,
        result,
    }))
}

/// Follow a fresh deployment to its terminal state, logging the outcome only
fn watch_in_background(provider: Arc<dyn HostingProvider>, deployment: DeploymentRef) {
    spawn_logged("watch-deployment", async move {
        let options = PollOptions::for_provider(provider.as_ref());
        let finished = poll_deployment(
            provider.as_ref(),
            &deployment,
            options,
            |_| {},
            AbortSignal::never(),
        )
        .await?;

        tracing::info!(
            provider = %provider.kind(),
            deployment_id = %finished.id,
            status = %finished.status,
            "Auto-deploy finished"
        );
        Ok(())
    });
}
