//! Deployment orchestration
//!
//! Turns a [`DeployRequest`] into resolved parameters, expands them into a
//! strategy list, and drives a [`HostingProvider`] through it.

use crate::detect::{DEFAULT_SCAN_DEPTH, detect_framework, resolve_root_directories};
use crate::error::DeployError;
use crate::github::RepositorySource;
use crate::providers::HostingProvider;
use crate::shared::{
    DeployParams, DeployRequest, DeployResult, ProviderKind, derive_project_name,
    normalize_root_directory, parse_repository,
};

pub mod env;
pub mod orchestrator;
pub mod poller;
pub mod strategy;

pub use env::{normalize_env_vars, reconcile_env_vars};
pub use orchestrator::{backoff_delay, deploy_with_strategies};
pub use poller::{AbortHandle, AbortSignal, PollOptions, poll_deployment};
pub use strategy::{DeployStrategy, build_deploy_strategies};

/// Parameters resolved from a request, plus fallback root directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeploy {
    pub params: DeployParams,
    pub root_candidates: Vec<String>,
}

/// Validate a request and fill in defaults that need no network access
pub fn base_params(request: &DeployRequest) -> Result<DeployParams, DeployError> {
    let (_, name) = parse_repository(&request.repository)?;

    let project_name = request
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(derive_project_name)
        .unwrap_or_else(|| derive_project_name(name));

    let branch = request
        .branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or("main")
        .to_string();

    let root_directory = request
        .root_directory
        .as_deref()
        .map(normalize_root_directory)
        .filter(|dir| !dir.is_empty());

    Ok(DeployParams {
        repository: request.repository.trim().to_string(),
        project_name,
        branch,
        root_directory,
        framework: request.framework,
        build_command: non_empty(&request.build_command),
        start_command: non_empty(&request.start_command),
        install_command: non_empty(&request.install_command),
        output_directory: non_empty(&request.output_directory),
        environment_variables: request.environment_variables.clone(),
        auto_detect_framework: request.auto_detect_framework,
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve root directory, framework, and default commands for `request`
///
/// Detection failures only lower the quality of the defaults; they never fail
/// the deploy.
pub async fn resolve_deploy<R: RepositorySource + ?Sized>(
    github: &R,
    provider: ProviderKind,
    request: &DeployRequest,
) -> Result<ResolvedDeploy, DeployError> {
    let mut params = base_params(request)?;
    let (owner, repo) = parse_repository(&request.repository)?;

    let mut root_candidates = Vec::new();
    if params.auto_detect_framework {
        root_candidates = resolve_root_directories(github, owner, repo, DEFAULT_SCAN_DEPTH).await;
        if params.root_directory.is_none()
            && let Some(primary) = root_candidates.first()
            && !primary.is_empty()
        {
            tracing::info!(repository = %params.repository, root = %primary, "Using detected root directory");
            params.root_directory = Some(primary.clone());
        }
    }

    if params.framework.is_none() && params.auto_detect_framework {
        params.framework =
            detect_framework(github, owner, repo, params.root_directory.as_deref()).await;
    }

    if let Some(framework) = params.framework {
        if params.build_command.is_none() {
            params.build_command = framework.default_build_command(provider).map(String::from);
        }
        if params.start_command.is_none() {
            params.start_command = framework.default_start_command(provider).map(String::from);
        }
    }

    tracing::info!(
        provider = %provider,
        repository = %params.repository,
        project = %params.project_name,
        branch = %params.branch,
        root = params.root_directory.as_deref().unwrap_or(""),
        framework = ?params.framework,
        "Resolved deploy parameters"
    );

    Ok(ResolvedDeploy {
        params,
        root_candidates,
    })
}

/// Full deploy: resolve, build strategies, and run them against `provider`
pub async fn run_deploy<R, P>(
    github: &R,
    provider: &P,
    request: &DeployRequest,
) -> Result<DeployResult, DeployError>
where
    R: RepositorySource + ?Sized,
    P: HostingProvider + ?Sized,
{
    let resolved = resolve_deploy(github, provider.kind(), request).await?;
    let strategies = build_deploy_strategies(&resolved.params, &resolved.root_candidates);

    tracing::debug!(
        strategies = ?strategies.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(),
        "Built deploy strategies"
    );

    deploy_with_strategies(provider, &strategies, request.enable_retry).await
}
