use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::DeployError;
use crate::github::{GitHubClient, RepositorySource};
use crate::handlers::{
    get_deployment, get_deployment_events, get_deployment_logs, handle_auto_deploy, handle_deploy,
};
use crate::providers::{HostingProvider, RenderClient, VercelClient};
use crate::shared::ProviderKind;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub github: Arc<dyn RepositorySource>,
    pub vercel: Option<Arc<dyn HostingProvider>>,
    pub render: Option<Arc<dyn HostingProvider>>,
}

impl AppState {
    /// Build clients for every configured integration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            github: Arc::new(GitHubClient::new(config.github.clone())),
            vercel: config
                .vercel
                .clone()
                .map(|c| Arc::new(VercelClient::new(c)) as Arc<dyn HostingProvider>),
            render: config
                .render
                .clone()
                .map(|c| Arc::new(RenderClient::new(c)) as Arc<dyn HostingProvider>),
        }
    }

    /// Client for `kind`, or an error if that integration is not configured
    pub fn provider(&self, kind: ProviderKind) -> Result<Arc<dyn HostingProvider>, DeployError> {
        let provider = match kind {
            ProviderKind::Vercel => self.vercel.clone(),
            ProviderKind::Render => self.render.clone(),
        };
        provider.ok_or(DeployError::ProviderDisabled(kind))
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/:provider/deploy", post(handle_deploy))
        .route("/api/:provider/auto-deploy", post(handle_auto_deploy))
        .route("/api/:provider/deployments/:id", get(get_deployment))
        .route("/api/:provider/deployments/:id/logs", get(get_deployment_logs))
        .route(
            "/api/:provider/deployments/:id/events",
            get(get_deployment_events),
        )
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config);

    for (kind, enabled) in [
        (ProviderKind::Vercel, state.vercel.is_some()),
        (ProviderKind::Render, state.render.is_some()),
    ] {
        if enabled {
            tracing::info!(provider = %kind, "Provider integration enabled");
        } else {
            tracing::warn!(provider = %kind, "Provider integration disabled (missing credentials)");
        }
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(addr = %config.listen_addr, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
