use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::providers::{HostingProvider, https_url, is_terminal_deploy_status};
use crate::shared::{
    DeployParams, Deployment, DeploymentRef, EnvVar, Project, ProviderKind, RemoteEnvVar,
};

const DASHBOARD_URL: &str = "https://dashboard.render.com/web";

/// Render REST client
#[derive(Clone)]
pub struct RenderClient {
    http_client: reqwest::Client,
    config: RenderConfig,
}

impl RenderClient {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Render API error {}: {}", status, body);
        }
        Ok(response)
    }

    /// Configured owner, or the first workspace the API key can see
    async fn owner_id(&self) -> Result<String> {
        if let Some(owner_id) = &self.config.owner_id {
            return Ok(owner_id.clone());
        }

        let response = self
            .http_client
            .get(self.url("/owners?limit=1"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to list Render owners")?;

        let owners: Vec<OwnerItem> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render owners")?;

        owners
            .into_iter()
            .next()
            .map(|item| item.owner.id)
            .context("No Render workspace available; set RENDER_OWNER_ID")
    }

    fn service_settings(params: &DeployParams) -> ServiceSettings {
        ServiceSettings {
            branch: params.branch.clone(),
            root_dir: params.root_directory.clone().unwrap_or_default(),
            service_details: ServiceDetailsUpdate {
                env_specific_details: EnvSpecificDetails {
                    build_command: params.build_command.clone(),
                    start_command: params.start_command.clone(),
                },
            },
        }
    }
}

#[async_trait]
impl HostingProvider for RenderClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Render
    }

    async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let response = self
            .http_client
            .get(self.url("/services"))
            .query(&[("name", name), ("limit", "20")])
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to query Render services")?;

        let services: Vec<ServiceItem> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render services")?;

        Ok(services
            .into_iter()
            .map(|item| item.service)
            .find(|service| service.name == name)
            .map(Into::into))
    }

    async fn create_project(&self, params: &DeployParams) -> Result<Project> {
        let request = CreateService {
            service_type: "web_service".to_string(),
            name: params.project_name.clone(),
            owner_id: self.owner_id().await?,
            repo: format!("https://github.com/{}", params.repository),
            branch: params.branch.clone(),
            root_dir: params.root_directory.clone(),
            auto_deploy: "yes".to_string(),
            service_details: CreateServiceDetails {
                env: "node".to_string(),
                plan: self.config.plan.clone(),
                region: self.config.region.clone(),
                env_specific_details: EnvSpecificDetails {
                    build_command: params.build_command.clone(),
                    start_command: params.start_command.clone(),
                },
            },
        };

        let response = self
            .http_client
            .post(self.url("/services"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to create Render service")?;

        let created: CreatedService = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse created Render service")?;

        Ok(created.service.into())
    }

    async fn update_project_settings(&self, project_id: &str, params: &DeployParams) -> Result<()> {
        let response = self
            .http_client
            .patch(self.url(&format!("/services/{}", project_id)))
            .bearer_auth(&self.config.api_key)
            .json(&Self::service_settings(params))
            .send()
            .await
            .context("Failed to update Render service")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn list_env_vars(&self, project_id: &str) -> Result<Vec<RemoteEnvVar>> {
        let response = self
            .http_client
            .get(self.url(&format!("/services/{}/env-vars", project_id)))
            .query(&[("limit", "100")])
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to list Render env vars")?;

        let items: Vec<EnvVarItem> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render env vars")?;

        Ok(items
            .into_iter()
            .map(|item| RemoteEnvVar {
                id: item.env_var.key.clone(),
                key: item.env_var.key,
                value: item.env_var.value,
                target: Vec::new(),
            })
            .collect())
    }

    async fn delete_env_var(&self, project_id: &str, env_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/services/{}/env-vars/{}", project_id, env_id)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to delete Render env var")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_env_var(&self, project_id: &str, env: &EnvVar) -> Result<()> {
        let response = self
            .http_client
            .put(self.url(&format!("/services/{}/env-vars/{}", project_id, env.key)))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "value": env.value }))
            .send()
            .await
            .context("Failed to create Render env var")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn trigger_deployment(
        &self,
        project: &Project,
        _params: &DeployParams,
    ) -> Result<Deployment> {
        let response = self
            .http_client
            .post(self.url(&format!("/services/{}/deploys", project.id)))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "clearCache": "do_not_clear" }))
            .send()
            .await
            .context("Failed to trigger Render deploy")?;

        let deploy: RenderDeploy = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render deploy")?;

        let mut deployment = deploy.into_deployment(&project.id);
        deployment.url = project.url.clone();
        Ok(deployment)
    }

    async fn get_deployment(&self, deployment: &DeploymentRef) -> Result<Option<Deployment>> {
        let service_id = deployment
            .service_id
            .as_deref()
            .context("Render deploy lookups require a service id")?;

        let response = self
            .http_client
            .get(self.url(&format!("/services/{}/deploys/{}", service_id, deployment.id)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to fetch Render deploy")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let deploy: RenderDeploy = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render deploy")?;

        Ok(Some(deploy.into_deployment(service_id)))
    }

    async fn get_deployment_events(&self, deployment: &DeploymentRef) -> Result<Vec<String>> {
        let service_id = deployment
            .service_id
            .as_deref()
            .context("Render event lookups require a service id")?;

        let response = self
            .http_client
            .get(self.url(&format!("/services/{}/events", service_id)))
            .query(&[("limit", "50")])
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to fetch Render events")?;

        let items: Vec<EventItem> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Render events")?;

        // Render returns newest first
        let mut lines: Vec<String> = items
            .into_iter()
            .map(|item| {
                let event = item.event;
                match event.details {
                    Some(details) if !details.is_null() => {
                        format!("{} {} {}", event.timestamp, event.event_type, details)
                    }
                    _ => format!("{} {}", event.timestamp, event.event_type),
                }
            })
            .collect();
        lines.reverse();
        Ok(lines)
    }

    fn is_terminal(&self, status: &str) -> bool {
        is_terminal_deploy_status(status)
    }

    fn dashboard_url(&self, project: &Project, _deployment: &Deployment) -> Option<String> {
        Some(format!("{}/{}", DASHBOARD_URL, project.id))
    }

    fn logs_url(&self, project: &Project, _deployment: &Deployment) -> Option<String> {
        Some(format!("{}/{}/logs", DASHBOARD_URL, project.id))
    }
}

// ==================== API Types ====================

#[derive(Debug, Deserialize)]
struct OwnerItem {
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct Owner {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceItem {
    service: RenderService,
}

#[derive(Debug, Deserialize)]
struct CreatedService {
    service: RenderService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderService {
    id: String,
    name: String,
    #[serde(default)]
    service_details: Option<ServiceDetails>,
}

#[derive(Debug, Deserialize)]
struct ServiceDetails {
    url: Option<String>,
}

impl From<RenderService> for Project {
    fn from(service: RenderService) -> Self {
        Project {
            url: service
                .service_details
                .and_then(|d| d.url)
                .as_deref()
                .map(https_url),
            id: service.id,
            name: service.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateService {
    #[serde(rename = "type")]
    service_type: String,
    name: String,
    owner_id: String,
    repo: String,
    branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    root_dir: Option<String>,
    auto_deploy: String,
    service_details: CreateServiceDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceDetails {
    env: String,
    plan: String,
    region: String,
    env_specific_details: EnvSpecificDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvSpecificDetails {
    build_command: Option<String>,
    start_command: Option<String>,
}

/// Full settings overwrite; an empty `rootDir` resets to the repo root
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceSettings {
    branch: String,
    root_dir: String,
    service_details: ServiceDetailsUpdate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDetailsUpdate {
    env_specific_details: EnvSpecificDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvVarItem {
    env_var: RenderEnvVar,
}

#[derive(Debug, Deserialize)]
struct RenderEnvVar {
    key: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderDeploy {
    id: String,
    status: Option<String>,
    created_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl RenderDeploy {
    fn into_deployment(self, service_id: &str) -> Deployment {
        let status = self.status.unwrap_or_else(|| "created".to_string());
        let error_message = status
            .to_lowercase()
            .contains("fail")
            .then(|| format!("Render deploy finished with status '{}'", status));

        Deployment {
            inspector_url: Some(format!("{}/{}/deploys/{}", DASHBOARD_URL, service_id, self.id)),
            id: self.id,
            status,
            project_id: Some(service_id.to_string()),
            url: None,
            created_at: self.created_at,
            finished_at: self.finished_at,
            error_code: None,
            error_message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventItem {
    event: RenderEvent,
}

#[derive(Debug, Deserialize)]
struct RenderEvent {
    timestamp: String,
    #[serde(rename = "type")]
    event_type: String,
    details: Option<serde_json::Value>,
}
