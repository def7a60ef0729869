use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::GitHubConfig;

/// Read access to a repository's files
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Read a file's UTF-8 contents; fails if the file does not exist
    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<String>;

    /// List `path` and its subdirectories down to `depth` levels
    async fn get_repo_structure(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        depth: usize,
    ) -> Result<Vec<RepoEntry>>;
}

/// File or directory in a repository tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RepoEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

impl RepoEntry {
    pub fn file(path: &str) -> Self {
        Self {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
            children: Vec::new(),
        }
    }

    pub fn dir(path: &str, children: Vec<RepoEntry>) -> Self {
        Self {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            kind: EntryKind::Dir,
            children,
        }
    }
}

/// GitHub REST client for repository contents
#[derive(Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    config: GitHubConfig,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    content: String,
    #[allow(dead_code)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    item_type: String,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/repos/{}/{}/contents", self.config.api_url, owner, repo)
        } else {
            format!(
                "{}/repos/{}/{}/contents/{}",
                self.config.api_url, owner, repo, path
            )
        }
    }

    async fn get_contents(&self, owner: &str, repo: &str, path: &str) -> Result<reqwest::Response> {
        let mut request = self
            .http_client
            .get(self.contents_url(owner, repo, path))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "poseidon-deploy")
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch repository contents from GitHub")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error {}: {}", status, body);
        }

        Ok(response)
    }

    fn list_dir<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RepoEntry>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.get_contents(owner, repo, path).await?;
            let items: Vec<ContentItem> = response
                .json()
                .await
                .with_context(|| format!("Failed to parse directory listing for '{}'", path))?;

            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                match item.item_type.as_str() {
                    "dir" => {
                        if item.name == "node_modules" || item.name.starts_with('.') {
                            continue;
                        }
                        let children = if depth > 1 {
                            // A failed sub-listing only loses that subtree
                            match self.list_dir(owner, repo, &item.path, depth - 1).await {
                                Ok(children) => children,
                                Err(e) => {
                                    tracing::warn!(
                                        owner,
                                        repo,
                                        path = %item.path,
                                        error = %e,
                                        "Could not list repository directory"
                                    );
                                    Vec::new()
                                }
                            }
                        } else {
                            Vec::new()
                        };
                        entries.push(RepoEntry {
                            name: item.name,
                            path: item.path,
                            kind: EntryKind::Dir,
                            children,
                        });
                    }
                    "file" => entries.push(RepoEntry {
                        name: item.name,
                        path: item.path,
                        kind: EntryKind::File,
                        children: Vec::new(),
                    }),
                    // Submodules and symlinks are not followed
                    _ => {}
                }
            }

            Ok(entries)
        })
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let response = self.get_contents(owner, repo, path).await?;

        let file: ContentFile = response
            .json()
            .await
            .context("Failed to parse GitHub content response")?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(file.content.replace('\n', ""))
            .context("Failed to decode base64 content")?;

        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path))
    }

    async fn get_repo_structure(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        depth: usize,
    ) -> Result<Vec<RepoEntry>> {
        if depth == 0 {
            return Ok(Vec::new());
        }
        self.list_dir(owner, repo, path, depth).await
    }
}
