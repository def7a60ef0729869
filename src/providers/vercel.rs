use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::VercelConfig;
use crate::providers::{HostingProvider, https_url, is_terminal_vercel_state};
use crate::shared::{
    DeployParams, Deployment, DeploymentRef, EnvVar, Project, ProviderKind, RemoteEnvVar,
};

/// Vercel REST client
#[derive(Clone)]
pub struct VercelClient {
    http_client: reqwest::Client,
    config: VercelConfig,
}

impl VercelClient {
    pub fn new(config: VercelConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    /// Build an API URL, scoping it to the configured team
    fn url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.config.api_url, path))
            .with_context(|| format!("Invalid Vercel API URL for {}", path))?;
        if let Some(team_id) = &self.config.team_id {
            url.query_pairs_mut().append_pair("teamId", team_id);
        }
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vercel API error {}: {}", status, body);
        }
        Ok(response)
    }

    fn project_settings(params: &DeployParams) -> ProjectSettings {
        ProjectSettings {
            framework: params
                .framework
                .and_then(|f| f.vercel_slug())
                .map(String::from),
            build_command: params.build_command.clone(),
            install_command: params.install_command.clone(),
            output_directory: params.output_directory.clone(),
            root_directory: params.root_directory.clone(),
        }
    }
}

#[async_trait]
impl HostingProvider for VercelClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vercel
    }

    async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let response = self
            .http_client
            .get(self.url(&format!("/v9/projects/{}", name))?)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to query Vercel project")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let project: VercelProject = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Vercel project")?;

        Ok(Some(project.into()))
    }

    async fn create_project(&self, params: &DeployParams) -> Result<Project> {
        let request = CreateProject {
            name: params.project_name.clone(),
            git_repository: GitRepository {
                repo_type: "github".to_string(),
                repo: params.repository.clone(),
            },
            settings: Self::project_settings(params),
        };

        let response = self
            .http_client
            .post(self.url("/v10/projects")?)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .context("Failed to create Vercel project")?;

        let project: VercelProject = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse created Vercel project")?;

        Ok(project.into())
    }

    async fn update_project_settings(&self, project_id: &str, params: &DeployParams) -> Result<()> {
        // Unset fields serialize as null so stale settings from earlier attempts are cleared
        let response = self
            .http_client
            .patch(self.url(&format!("/v9/projects/{}", project_id))?)
            .bearer_auth(&self.config.token)
            .json(&Self::project_settings(params))
            .send()
            .await
            .context("Failed to update Vercel project settings")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn list_env_vars(&self, project_id: &str) -> Result<Vec<RemoteEnvVar>> {
        let response = self
            .http_client
            .get(self.url(&format!("/v9/projects/{}/env", project_id))?)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to list Vercel env vars")?;

        let list: EnvList = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Vercel env vars")?;

        Ok(list
            .envs
            .into_iter()
            .map(|env| RemoteEnvVar {
                id: env.id,
                key: env.key,
                value: env.value,
                target: env.target.into_vec(),
            })
            .collect())
    }

    async fn delete_env_var(&self, project_id: &str, env_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/v9/projects/{}/env/{}", project_id, env_id))?)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to delete Vercel env var")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_env_var(&self, project_id: &str, env: &EnvVar) -> Result<()> {
        let request = CreateEnv {
            key: env.key.clone(),
            value: env.value.clone(),
            env_type: "encrypted".to_string(),
            target: env.targets(),
        };

        let response = self
            .http_client
            .post(self.url(&format!("/v10/projects/{}/env", project_id))?)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .context("Failed to create Vercel env var")?;

        Self::check(response).await?;
        Ok(())
    }

    async fn trigger_deployment(
        &self,
        project: &Project,
        params: &DeployParams,
    ) -> Result<Deployment> {
        let (org, repo) = params.owner_and_repo();
        let request = CreateDeployment {
            name: project.name.clone(),
            project: project.id.clone(),
            target: "production".to_string(),
            git_source: GitSource {
                source_type: "github".to_string(),
                org: org.to_string(),
                repo: repo.to_string(),
                git_ref: params.branch.clone(),
            },
        };

        let response = self
            .http_client
            .post(self.url("/v13/deployments")?)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .context("Failed to create Vercel deployment")?;

        let deployment: VercelDeployment = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Vercel deployment")?;

        Ok(deployment.into())
    }

    async fn get_deployment(&self, deployment: &DeploymentRef) -> Result<Option<Deployment>> {
        let response = self
            .http_client
            .get(self.url(&format!("/v13/deployments/{}", deployment.id))?)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to fetch Vercel deployment")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let deployment: VercelDeployment = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Vercel deployment")?;

        Ok(Some(deployment.into()))
    }

    async fn get_deployment_events(&self, deployment: &DeploymentRef) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(self.url(&format!("/v3/deployments/{}/events", deployment.id))?)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to fetch Vercel deployment events")?;

        let events: Vec<DeploymentEvent> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse Vercel deployment events")?;

        Ok(events
            .into_iter()
            .filter_map(|event| event.text.or(event.payload.and_then(|p| p.text)))
            .collect())
    }

    fn is_terminal(&self, status: &str) -> bool {
        is_terminal_vercel_state(status)
    }

    fn dashboard_url(&self, _project: &Project, deployment: &Deployment) -> Option<String> {
        deployment.inspector_url.clone()
    }

    fn logs_url(&self, _project: &Project, deployment: &Deployment) -> Option<String> {
        // The inspector page carries the build log
        deployment.inspector_url.clone()
    }
}

// ==================== API Types ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSettings {
    framework: Option<String>,
    build_command: Option<String>,
    install_command: Option<String>,
    output_directory: Option<String>,
    root_directory: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProject {
    name: String,
    git_repository: GitRepository,
    #[serde(flatten)]
    settings: ProjectSettings,
}

#[derive(Debug, Serialize)]
struct GitRepository {
    #[serde(rename = "type")]
    repo_type: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct VercelProject {
    id: String,
    name: String,
}

impl From<VercelProject> for Project {
    fn from(project: VercelProject) -> Self {
        Project {
            url: Some(format!("https://{}.vercel.app", project.name)),
            id: project.id,
            name: project.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvList {
    #[serde(default)]
    envs: Vec<VercelEnv>,
}

#[derive(Debug, Deserialize)]
struct VercelEnv {
    id: String,
    key: String,
    value: Option<String>,
    #[serde(default)]
    target: EnvTarget,
}

/// Vercel returns `target` as either a string or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvTarget {
    One(String),
    Many(Vec<String>),
}

impl Default for EnvTarget {
    fn default() -> Self {
        EnvTarget::Many(Vec::new())
    }
}

impl EnvTarget {
    fn into_vec(self) -> Vec<String> {
        match self {
            EnvTarget::One(target) => vec![target],
            EnvTarget::Many(targets) => targets,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateEnv {
    key: String,
    value: String,
    #[serde(rename = "type")]
    env_type: String,
    target: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDeployment {
    name: String,
    project: String,
    target: String,
    git_source: GitSource,
}

#[derive(Debug, Serialize)]
struct GitSource {
    #[serde(rename = "type")]
    source_type: String,
    org: String,
    repo: String,
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VercelDeployment {
    id: String,
    url: Option<String>,
    #[serde(alias = "state")]
    ready_state: Option<String>,
    project_id: Option<String>,
    created_at: Option<i64>,
    ready: Option<i64>,
    error_code: Option<String>,
    error_message: Option<String>,
    inspector_url: Option<String>,
}

impl From<VercelDeployment> for Deployment {
    fn from(d: VercelDeployment) -> Self {
        Deployment {
            id: d.id,
            status: d.ready_state.unwrap_or_else(|| "QUEUED".to_string()),
            project_id: d.project_id,
            url: d.url.as_deref().map(https_url),
            created_at: d.created_at.and_then(millis_to_datetime),
            finished_at: d.ready.and_then(millis_to_datetime),
            error_code: d.error_code,
            error_message: d.error_message,
            inspector_url: d.inspector_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentEvent {
    text: Option<String>,
    payload: Option<EventPayload>,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    text: Option<String>,
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
