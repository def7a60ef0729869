use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::DeployError;
use crate::handlers::parse_provider;
use crate::server::AppState;
use crate::shared::{DeploymentRef, ProviderKind};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentQuery {
    /// Owning service; required for Render lookups
    #[serde(default, alias = "service_id")]
    pub service_id: Option<String>,
}

impl DeploymentQuery {
    fn deployment_ref(&self, id: String) -> DeploymentRef {
        DeploymentRef {
            id,
            service_id: self.service_id.clone(),
        }
    }
}

fn require_service_id(kind: ProviderKind, deployment: &DeploymentRef) -> Result<(), DeployError> {
    if kind == ProviderKind::Render && deployment.service_id.is_none() {
        return Err(DeployError::Validation(
            "serviceId query parameter is required for Render deployments".to_string(),
        ));
    }
    Ok(())
}

/// Current state of a deployment
pub async fn get_deployment(
    State(state): State<AppState>,
    Path((provider, id)): Path<(String, String)>,
    Query(query): Query<DeploymentQuery>,
) -> Result<Json<Value>, DeployError> {
    let kind = parse_provider(&provider)?;
    let deployment = query.deployment_ref(id);
    require_service_id(kind, &deployment)?;

    let found = state
        .provider(kind)?
        .get_deployment(&deployment)
        .await?
        .ok_or_else(|| DeployError::NotFound(format!("deployment {}", deployment.id)))?;

    Ok(Json(json!({ "deployment": found })))
}

/// Build logs as plain text
pub async fn get_deployment_logs(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<DeploymentQuery>,
) -> Json<Value> {
    deployment_text(state, path, query, "logsCount").await
}

/// Deploy events as plain text
pub async fn get_deployment_events(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<DeploymentQuery>,
) -> Json<Value> {
    deployment_text(state, path, query, "eventsCount").await
}

/// Log viewer payload; failures degrade to empty text with an `error` field
async fn deployment_text(
    State(state): State<AppState>,
    Path((provider, id)): Path<(String, String)>,
    Query(query): Query<DeploymentQuery>,
    count_field: &str,
) -> Json<Value> {
    let deployment = query.deployment_ref(id);

    let lines = async {
        let kind = parse_provider(&provider)?;
        require_service_id(kind, &deployment)?;
        let lines = state
            .provider(kind)?
            .get_deployment_events(&deployment)
            .await?;
        Ok::<_, DeployError>(lines)
    }
    .await;

    match lines {
        Ok(lines) => Json(json!({
            "text": lines.join("\n"),
            count_field: lines.len(),
        })),
        Err(e) => {
            tracing::warn!(
                provider = %provider,
                deployment_id = %deployment.id,
                error = %e,
                "Failed to fetch deployment logs"
            );
            Json(json!({
                "text": "",
                count_field: 0,
                "error": e.to_string(),
            }))
        }
    }
}
