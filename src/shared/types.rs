use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use derive_more::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Default Vercel target environments for an env var with no explicit target
pub const DEFAULT_ENV_TARGETS: [&str; 3] = ["production", "preview", "development"];

/// Maximum project name length accepted by the hosting providers
const MAX_PROJECT_NAME_LEN: usize = 100;

static REPOSITORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/]+/[^/]+$").expect("valid repository regex"));

static NAME_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid name regex"));

/// Hosting provider a deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[display("vercel")]
    Vercel,
    #[display("render")]
    Render,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vercel" => Ok(ProviderKind::Vercel),
            "render" => Ok(ProviderKind::Render),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Application framework, as detected from `package.json` or requested explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    #[display("nextjs")]
    Nextjs,
    #[display("create-react-app")]
    CreateReactApp,
    #[display("vite")]
    Vite,
    #[display("vue")]
    Vue,
    #[serde(alias = "nuxtjs")]
    #[display("nuxt")]
    Nuxt,
    #[display("gatsby")]
    Gatsby,
    #[display("svelte")]
    Svelte,
    #[display("sveltekit")]
    Sveltekit,
    #[display("angular")]
    Angular,
    #[display("astro")]
    Astro,
    #[display("remix")]
    Remix,
    #[display("node")]
    Node,
}

impl Framework {
    /// Framework slug understood by Vercel's project API
    ///
    /// Plain Node servers have no Vercel preset and are left to auto-detection.
    pub fn vercel_slug(&self) -> Option<&'static str> {
        match self {
            Framework::Nextjs => Some("nextjs"),
            Framework::CreateReactApp => Some("create-react-app"),
            Framework::Vite => Some("vite"),
            Framework::Vue => Some("vue"),
            Framework::Nuxt => Some("nuxtjs"),
            Framework::Gatsby => Some("gatsby"),
            Framework::Svelte => Some("svelte"),
            Framework::Sveltekit => Some("sveltekit"),
            Framework::Angular => Some("angular"),
            Framework::Astro => Some("astro"),
            Framework::Remix => Some("remix"),
            Framework::Node => None,
        }
    }

    /// Default build command for this framework on the given provider
    ///
    /// Next.js on Vercel is left entirely to the platform preset.
    pub fn default_build_command(&self, provider: ProviderKind) -> Option<&'static str> {
        match (self, provider) {
            (Framework::Nextjs, ProviderKind::Vercel) => None,
            _ => Some("npm ci && npm run build"),
        }
    }

    /// Default start command for this framework on the given provider
    pub fn default_start_command(&self, provider: ProviderKind) -> Option<&'static str> {
        match (self, provider) {
            (_, ProviderKind::Vercel) => None,
            (Framework::Nextjs, ProviderKind::Render) => Some("npm run start -- -p $PORT"),
            (_, ProviderKind::Render) => Some("npm run start"),
        }
    }
}

impl std::str::FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nextjs" | "next" => Ok(Framework::Nextjs),
            "create-react-app" | "cra" => Ok(Framework::CreateReactApp),
            "vite" => Ok(Framework::Vite),
            "vue" => Ok(Framework::Vue),
            "nuxt" | "nuxtjs" => Ok(Framework::Nuxt),
            "gatsby" => Ok(Framework::Gatsby),
            "svelte" => Ok(Framework::Svelte),
            "sveltekit" => Ok(Framework::Sveltekit),
            "angular" => Ok(Framework::Angular),
            "astro" => Ok(Framework::Astro),
            "remix" => Ok(Framework::Remix),
            "node" | "express" => Ok(Framework::Node),
            _ => Err(format!("Unknown framework: {}", s)),
        }
    }
}

/// Desired environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
    /// Target environments; `None` means the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<String>>,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            target: None,
        }
    }

    /// Target list with the provider default applied
    pub fn targets(&self) -> Vec<String> {
        match &self.target {
            Some(target) if !target.is_empty() => target.clone(),
            _ => DEFAULT_ENV_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Environment variable as it exists on the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEnvVar {
    /// Provider-assigned identifier (Render uses the key itself)
    pub id: String,
    pub key: String,
    pub value: Option<String>,
    #[serde(default)]
    pub target: Vec<String>,
}

/// User-supplied intent to deploy a GitHub repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(default)]
    pub repository: String,

    #[serde(default, alias = "serviceName")]
    pub project_name: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default)]
    pub root_directory: Option<String>,

    /// Unrecognized names fall back to auto-detection
    #[serde(default, deserialize_with = "lenient_framework")]
    pub framework: Option<Framework>,

    #[serde(default)]
    pub build_command: Option<String>,

    #[serde(default)]
    pub start_command: Option<String>,

    #[serde(default)]
    pub install_command: Option<String>,

    #[serde(default)]
    pub output_directory: Option<String>,

    #[serde(default)]
    pub environment_variables: Vec<EnvVar>,

    #[serde(default = "default_true")]
    pub auto_detect_framework: bool,

    #[serde(default = "default_true")]
    pub enable_retry: bool,
}

fn default_true() -> bool {
    true
}

fn lenient_framework<'de, D>(deserializer: D) -> Result<Option<Framework>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .and_then(|n| match n.parse() {
            Ok(framework) => Some(framework),
            Err(_) => {
                tracing::warn!(framework = %n, "Unknown framework, using auto-detection");
                None
            }
        }))
}

impl DeployRequest {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            auto_detect_framework: true,
            enable_retry: true,
            ..Default::default()
        }
    }
}

/// One fully-resolved parameter set sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParams {
    pub repository: String,
    pub project_name: String,
    pub branch: String,
    pub root_directory: Option<String>,
    pub framework: Option<Framework>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
    pub install_command: Option<String>,
    pub output_directory: Option<String>,
    pub environment_variables: Vec<EnvVar>,
    pub auto_detect_framework: bool,
}

impl DeployParams {
    /// Repository owner and name
    pub fn owner_and_repo(&self) -> (&str, &str) {
        self.repository
            .split_once('/')
            .unwrap_or(("", self.repository.as_str()))
    }
}

/// Outcome of a successful deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub project_id: String,
    pub project_name: String,
    pub deployment_id: String,
    pub url: Option<String>,
    pub status: String,
    pub dashboard_url: Option<String>,
    pub logs_url: Option<String>,
    /// 1-based index of the strategy that succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries_used: Option<usize>,
}

/// Project (Vercel) or service (Render) on the hosting provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// Reference to a deployment; Render lookups also need the owning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRef {
    pub id: String,
    pub service_id: Option<String>,
}

impl DeploymentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_id: None,
        }
    }

    pub fn with_service(id: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_id: Some(service_id.into()),
        }
    }
}

/// Deployment as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub status: String,
    pub project_id: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Provider page for inspecting this deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector_url: Option<String>,
}

/// Validate an `owner/name` repository identifier
pub fn parse_repository(repository: &str) -> Result<(&str, &str), DeployError> {
    let repository = repository.trim();
    if repository.is_empty() {
        return Err(DeployError::Validation(
            "repository is required".to_string(),
        ));
    }
    if !REPOSITORY_RE.is_match(repository) {
        return Err(DeployError::Validation(format!(
            "repository must be in owner/name format, got '{}'",
            repository
        )));
    }
    repository
        .split_once('/')
        .ok_or_else(|| DeployError::Validation("repository must contain '/'".to_string()))
}

/// Normalize a root directory: strip `./` and surrounding slashes, `.`/`/` mean repo root
pub fn normalize_root_directory(dir: &str) -> String {
    let mut dir = dir.trim();
    while let Some(rest) = dir.strip_prefix("./") {
        dir = rest;
    }
    let dir = dir.trim_matches('/');
    if dir == "." { String::new() } else { dir.to_string() }
}

/// Derive a provider-safe project name from a repository name
pub fn derive_project_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let collapsed = NAME_SEPARATOR_RE.replace_all(&lowered, "-");
    let trimmed = collapsed.trim_matches('-');
    let mut name: String = trimmed.chars().take(MAX_PROJECT_NAME_LEN).collect();
    while name.ends_with('-') {
        name.pop();
    }
    if name.is_empty() {
        "app".to_string()
    } else {
        name
    }
}
