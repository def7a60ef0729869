//! Retry strategies as data
//!
//! Each strategy drops one more dimension that commonly trips provider-side
//! validation, converging on the platform's own auto-detection.

use crate::shared::{DeployParams, normalize_root_directory};

/// Upper bound on strategies tried for one deploy
pub const MAX_STRATEGIES: usize = 8;

/// Env vars kept by the minimal strategy
pub const MINIMAL_ENV_VAR_LIMIT: usize = 10;

/// One concrete attempt in the retry sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployStrategy {
    /// Stable identifier (`default`, `no-framework`, `root:apps/web`, ...)
    pub key: String,
    /// Human description for logs
    pub label: String,
    pub params: DeployParams,
}

impl DeployStrategy {
    fn new(key: impl Into<String>, label: impl Into<String>, params: DeployParams) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            params,
        }
    }
}

/// Build the ordered, deduplicated strategy list for `base`
///
/// `root_candidates` are alternative root directories; the one already used
/// by `base` is skipped. The empty string stands for the repository root.
pub fn build_deploy_strategies(base: &DeployParams, root_candidates: &[String]) -> Vec<DeployStrategy> {
    let mut candidates = vec![DeployStrategy::new(
        "default",
        "Requested configuration",
        base.clone(),
    )];

    if base.framework.is_some() {
        candidates.push(DeployStrategy::new(
            "no-framework",
            "Without framework preset",
            DeployParams {
                framework: None,
                ..base.clone()
            },
        ));
    }

    if base.root_directory.is_some() {
        candidates.push(DeployStrategy::new(
            "no-root-dir",
            "From repository root",
            DeployParams {
                root_directory: None,
                ..base.clone()
            },
        ));
    }

    let current_root = base
        .root_directory
        .as_deref()
        .map(normalize_root_directory)
        .unwrap_or_default();

    for candidate in root_candidates {
        let candidate = normalize_root_directory(candidate);
        if candidate == current_root {
            continue;
        }
        let label = if candidate.is_empty() {
            "Auto-detect from repository root".to_string()
        } else {
            format!("Auto-detect in {}", candidate)
        };
        candidates.push(DeployStrategy::new(
            format!("root:{}", candidate),
            label,
            DeployParams {
                root_directory: (!candidate.is_empty()).then_some(candidate),
                framework: None,
                auto_detect_framework: true,
                ..base.clone()
            },
        ));
    }

    candidates.push(DeployStrategy::new(
        "minimal",
        "Minimal configuration",
        DeployParams {
            repository: base.repository.clone(),
            project_name: base.project_name.clone(),
            branch: base.branch.clone(),
            root_directory: None,
            framework: None,
            build_command: None,
            start_command: None,
            install_command: None,
            output_directory: None,
            environment_variables: base
                .environment_variables
                .iter()
                .take(MINIMAL_ENV_VAR_LIMIT)
                .cloned()
                .collect(),
            auto_detect_framework: true,
        },
    ));

    let mut strategies: Vec<DeployStrategy> = Vec::new();
    for candidate in candidates {
        if strategies.iter().any(|s| s.params == candidate.params) {
            continue;
        }
        strategies.push(candidate);
        if strategies.len() == MAX_STRATEGIES {
            break;
        }
    }

    strategies
}
