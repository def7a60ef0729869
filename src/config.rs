use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const VERCEL_API_URL: &str = "https://api.vercel.com";
pub const RENDER_API_URL: &str = "https://api.render.com/v1";

/// Top-level configuration, loaded once and handed to every client
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,

    pub github: GitHubConfig,

    /// Vercel integration; `None` when no token is configured
    pub vercel: Option<VercelConfig>,

    /// Render integration; `None` when no API key is configured
    pub render: Option<RenderConfig>,
}

/// GitHub API access
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Personal access token (unauthenticated reads when absent)
    pub token: Option<String>,

    /// Default owner for bare repository names
    pub username: Option<String>,

    pub api_url: String,
}

/// Vercel API access
#[derive(Debug, Clone)]
pub struct VercelConfig {
    pub token: String,

    /// Team scope, sent as `teamId` on every call
    pub team_id: Option<String>,

    pub api_url: String,
}

/// Render API access
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub api_key: String,

    /// Workspace owning newly created services
    pub owner_id: Option<String>,

    /// Instance plan for new services
    pub plan: String,

    /// Region for new services
    pub region: String,

    pub api_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
                .parse()
                .context("LISTEN_ADDR must be a valid socket address")?,

            github: GitHubConfig {
                token: non_empty_var("GITHUB_TOKEN"),
                username: non_empty_var("GITHUB_USERNAME"),
                api_url: non_empty_var("GITHUB_API_URL")
                    .unwrap_or_else(|| GITHUB_API_URL.to_string()),
            },

            vercel: non_empty_var("VERCEL_TOKEN")
                .or_else(|| non_empty_var("VERCEL_API_KEY"))
                .map(|token| VercelConfig {
                    token,
                    team_id: non_empty_var("VERCEL_TEAM_ID"),
                    api_url: non_empty_var("VERCEL_API_URL")
                        .unwrap_or_else(|| VERCEL_API_URL.to_string()),
                }),

            render: non_empty_var("RENDER_API_KEY").map(|api_key| RenderConfig {
                api_key,
                owner_id: non_empty_var("RENDER_OWNER_ID"),
                plan: non_empty_var("RENDER_PLAN").unwrap_or_else(|| "starter".to_string()),
                region: non_empty_var("RENDER_REGION").unwrap_or_else(|| "oregon".to_string()),
                api_url: non_empty_var("RENDER_API_URL")
                    .unwrap_or_else(|| RENDER_API_URL.to_string()),
            }),
        })
    }
}

impl GitHubConfig {
    /// Expand a bare repository name with the configured default owner
    pub fn qualify_repository(&self, repository: &str) -> String {
        match (&self.username, repository.contains('/')) {
            (Some(owner), false) if !repository.is_empty() => format!("{}/{}", owner, repository),
            _ => repository.to_string(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            username: None,
            api_url: GITHUB_API_URL.to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
