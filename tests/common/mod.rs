//! Common test utilities and fixtures

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use poseidon_deploy::github::{RepoEntry, RepositorySource};
use poseidon_deploy::providers::{
    HostingProvider, is_terminal_deploy_status, is_terminal_vercel_state,
};
use poseidon_deploy::shared::{
    DeployParams, Deployment, DeploymentRef, EnvVar, Project, ProviderKind, RemoteEnvVar,
};

/// In-memory hosting provider
pub struct FakeProvider {
    kind: ProviderKind,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    projects: Vec<Project>,
    env: HashMap<String, Vec<RemoteEnvVar>>,
    next_id: u64,
    /// Parameters of every create/update, one per deploy attempt
    settings_writes: Vec<DeployParams>,
    trigger_failures: usize,
    fail_env_deletes: bool,
    env_list_calls: usize,
    /// Scripted statuses for `get_deployment`; the last one repeats
    statuses: VecDeque<String>,
    deployment_missing: bool,
    fetch_delay: Option<Duration>,
    get_deployment_calls: usize,
    events: Option<Vec<String>>,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            state: Mutex::new(FakeState {
                events: Some(vec!["Cloning".to_string(), "Build completed".to_string()]),
                ..Default::default()
            }),
        }
    }

    /// Make the next `count` deployment triggers fail
    pub fn failing_triggers(self, count: usize) -> Self {
        self.state.lock().unwrap().trigger_failures = count;
        self
    }

    pub fn failing_env_deletes(self) -> Self {
        self.state.lock().unwrap().fail_env_deletes = true;
        self
    }

    pub fn with_project(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("prj_{}", state.next_id);
            state.projects.push(Project {
                id,
                name: name.to_string(),
                url: Some(format!("https://{}.example.app", name)),
            });
        }
        self
    }

    pub fn with_env(self, project_id: &str, vars: Vec<RemoteEnvVar>) -> Self {
        self.state
            .lock()
            .unwrap()
            .env
            .insert(project_id.to_string(), vars);
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        self.state.lock().unwrap().statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_missing_deployment(self) -> Self {
        self.state.lock().unwrap().deployment_missing = true;
        self
    }

    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().fetch_delay = Some(delay);
        self
    }

    pub fn with_failing_events(self) -> Self {
        self.state.lock().unwrap().events = None;
        self
    }

    pub fn settings_writes(&self) -> Vec<DeployParams> {
        self.state.lock().unwrap().settings_writes.clone()
    }

    pub fn env_snapshot(&self, project_id: &str) -> Vec<RemoteEnvVar> {
        let mut vars = self
            .state
            .lock()
            .unwrap()
            .env
            .get(project_id)
            .cloned()
            .unwrap_or_default();
        vars.sort_by(|a, b| a.key.cmp(&b.key));
        vars
    }

    pub fn env_list_calls(&self) -> usize {
        self.state.lock().unwrap().env_list_calls
    }

    pub fn get_deployment_calls(&self) -> usize {
        self.state.lock().unwrap().get_deployment_calls
    }

    pub fn project_count(&self) -> usize {
        self.state.lock().unwrap().projects.len()
    }
}

#[async_trait]
impl HostingProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let state = self.state.lock().unwrap();
        Ok(state.projects.iter().find(|p| p.name == name).cloned())
    }

    async fn create_project(&self, params: &DeployParams) -> Result<Project> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let project = Project {
            id: format!("prj_{}", state.next_id),
            name: params.project_name.clone(),
            url: Some(format!("https://{}.example.app", params.project_name)),
        };
        state.projects.push(project.clone());
        state.settings_writes.push(params.clone());
        Ok(project)
    }

    async fn update_project_settings(&self, _project_id: &str, params: &DeployParams) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .settings_writes
            .push(params.clone());
        Ok(())
    }

    async fn list_env_vars(&self, project_id: &str) -> Result<Vec<RemoteEnvVar>> {
        let mut state = self.state.lock().unwrap();
        state.env_list_calls += 1;
        Ok(state.env.get(project_id).cloned().unwrap_or_default())
    }

    async fn delete_env_var(&self, project_id: &str, env_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_env_deletes {
            anyhow::bail!("Fake API error 500: delete failed");
        }
        if let Some(vars) = state.env.get_mut(project_id) {
            vars.retain(|v| v.id != env_id);
        }
        Ok(())
    }

    async fn create_env_var(&self, project_id: &str, env: &EnvVar) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("env_{}", state.next_id);
        state
            .env
            .entry(project_id.to_string())
            .or_default()
            .push(RemoteEnvVar {
                id,
                key: env.key.clone(),
                value: Some(env.value.clone()),
                target: env.targets(),
            });
        Ok(())
    }

    async fn trigger_deployment(
        &self,
        project: &Project,
        params: &DeployParams,
    ) -> Result<Deployment> {
        let mut state = self.state.lock().unwrap();
        if state.trigger_failures > 0 {
            state.trigger_failures -= 1;
            anyhow::bail!(
                "Fake API error 400: invalid configuration for {}",
                params.root_directory.as_deref().unwrap_or("<root>")
            );
        }
        state.next_id += 1;
        Ok(Deployment {
            id: format!("dpl_{}", state.next_id),
            status: "QUEUED".to_string(),
            project_id: Some(project.id.clone()),
            url: project.url.clone(),
            created_at: None,
            finished_at: None,
            error_code: None,
            error_message: None,
            inspector_url: Some(format!("https://dashboard.example/{}", project.id)),
        })
    }

    async fn get_deployment(&self, deployment: &DeploymentRef) -> Result<Option<Deployment>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.get_deployment_calls += 1;
            state.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.deployment_missing {
            return Ok(None);
        }
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap_or_default()
        } else {
            state
                .statuses
                .front()
                .cloned()
                .unwrap_or_else(|| "READY".to_string())
        };

        Ok(Some(Deployment {
            id: deployment.id.clone(),
            status,
            project_id: deployment.service_id.clone(),
            url: None,
            created_at: None,
            finished_at: None,
            error_code: None,
            error_message: None,
            inspector_url: None,
        }))
    }

    async fn get_deployment_events(&self, _deployment: &DeploymentRef) -> Result<Vec<String>> {
        match &self.state.lock().unwrap().events {
            Some(events) => Ok(events.clone()),
            None => anyhow::bail!("Fake API error 502: bad gateway"),
        }
    }

    fn is_terminal(&self, status: &str) -> bool {
        match self.kind {
            ProviderKind::Vercel => is_terminal_vercel_state(status),
            ProviderKind::Render => is_terminal_deploy_status(status),
        }
    }

    fn dashboard_url(&self, project: &Project, _deployment: &Deployment) -> Option<String> {
        Some(format!("https://dashboard.example/{}", project.id))
    }

    fn logs_url(&self, project: &Project, _deployment: &Deployment) -> Option<String> {
        Some(format!("https://dashboard.example/{}/logs", project.id))
    }
}

/// In-memory repository
#[derive(Default)]
pub struct FakeRepository {
    files: HashMap<String, String>,
    tree: Vec<RepoEntry>,
    unreachable: bool,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every GitHub call fails
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }

    pub fn with_tree(mut self, tree: Vec<RepoEntry>) -> Self {
        self.tree = tree;
        self
    }

    /// Single Next.js app at `apps/web` with a root workspace package
    pub fn next_monorepo() -> Self {
        Self::new()
            .with_file("package.json", r#"{"devDependencies": {"turbo": "2"}}"#)
            .with_file(
                "apps/web/package.json",
                r#"{"dependencies": {"next": "14.0.0", "react": "18.2.0"}}"#,
            )
            .with_tree(vec![
                RepoEntry::file("package.json"),
                RepoEntry::dir(
                    "apps",
                    vec![RepoEntry::dir(
                        "apps/web",
                        vec![RepoEntry::file("apps/web/package.json")],
                    )],
                ),
                RepoEntry::dir(
                    "packages",
                    vec![RepoEntry::dir(
                        "packages/ui",
                        vec![RepoEntry::file("packages/ui/package.json")],
                    )],
                ),
            ])
    }
}

#[async_trait]
impl RepositorySource for FakeRepository {
    async fn get_file_content(&self, _owner: &str, _repo: &str, path: &str) -> Result<String> {
        if self.unreachable {
            anyhow::bail!("GitHub API error 503: unavailable");
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GitHub API error 404 Not Found: {}", path))
    }

    async fn get_repo_structure(
        &self,
        _owner: &str,
        _repo: &str,
        _path: &str,
        _depth: usize,
    ) -> Result<Vec<RepoEntry>> {
        if self.unreachable {
            anyhow::bail!("GitHub API error 503: unavailable");
        }
        Ok(self.tree.clone())
    }
}

pub fn remote_env(id: &str, key: &str, value: &str, target: &[&str]) -> RemoteEnvVar {
    RemoteEnvVar {
        id: id.to_string(),
        key: key.to_string(),
        value: Some(value.to_string()),
        target: target.iter().map(|t| t.to_string()).collect(),
    }
}
