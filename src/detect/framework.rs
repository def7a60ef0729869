use std::collections::HashMap;

use serde::Deserialize;

use crate::github::RepositorySource;
use crate::shared::Framework;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: HashMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: HashMap<String, serde_json::Value>,
}

/// Ordered classification rules; the first rule whose packages are all present wins
const RULES: &[(&[&str], Framework)] = &[
    (&["next"], Framework::Nextjs),
    (&["react", "react-scripts"], Framework::CreateReactApp),
    (&["react", "vite"], Framework::Vite),
    (&["vue", "@vue/cli-service"], Framework::Vue),
    (&["nuxt"], Framework::Nuxt),
    (&["gatsby"], Framework::Gatsby),
    (&["@sveltejs/kit"], Framework::Sveltekit),
    (&["svelte"], Framework::Svelte),
    (&["@angular/core"], Framework::Angular),
    (&["astro"], Framework::Astro),
    (&["@remix-run/react"], Framework::Remix),
    (&["remix"], Framework::Remix),
    (&["vite"], Framework::Vite),
    (&["express"], Framework::Node),
];

/// Classify a `package.json` document
pub fn classify_package_json(contents: &str) -> Result<Option<Framework>, serde_json::Error> {
    let package: PackageJson = serde_json::from_str(contents)?;

    let mut deps = package.dependencies;
    deps.extend(package.dev_dependencies);

    Ok(RULES
        .iter()
        .find(|(packages, _)| packages.iter().all(|p| deps.contains_key(*p)))
        .map(|(_, framework)| *framework))
}

/// Detect the framework of `owner/repo` from its `package.json`
///
/// Returns `None` when the file is missing, unparsable, or matches no rule.
pub async fn detect_framework<R: RepositorySource + ?Sized>(
    github: &R,
    owner: &str,
    repo: &str,
    root_directory: Option<&str>,
) -> Option<Framework> {
    let path = match root_directory.filter(|dir| !dir.is_empty()) {
        Some(dir) => format!("{}/package.json", dir),
        None => "package.json".to_string(),
    };

    let contents = match github.get_file_content(owner, repo, &path).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(owner, repo, path = %path, error = %e, "Could not read package.json");
            return None;
        }
    };

    match classify_package_json(&contents) {
        Ok(framework) => {
            tracing::debug!(owner, repo, path = %path, framework = ?framework, "Framework detection finished");
            framework
        }
        Err(e) => {
            tracing::warn!(owner, repo, path = %path, error = %e, "Invalid package.json");
            None
        }
    }
}
