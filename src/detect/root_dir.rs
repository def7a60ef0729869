use crate::github::{EntryKind, RepoEntry, RepositorySource};
use crate::shared::normalize_root_directory;

/// How deep to walk a repository looking for `package.json`
pub const DEFAULT_SCAN_DEPTH: usize = 6;

const BASE_SCORE: i32 = 100;
const SEGMENT_WEIGHT: i32 = 10;

/// Path patterns that usually hold the deployable app; lower score is preferred
const CONTAINS_BONUSES: &[(&str, i32)] = &[("apps/web", 50), ("apps/site", 45), ("apps/app", 40)];

const SUFFIX_BONUSES: &[(&str, i32)] = &[
    ("/web", 20),
    ("/frontend", 15),
    ("/client", 10),
    ("/site", 10),
];

/// Score a normalized candidate directory; lower is better
///
/// `100 + 10 * segments`, minus the first matching `contains` bonus and the
/// first matching suffix bonus. The repo root has no segments and scores 100.
pub fn score_root_candidate(dir: &str) -> i32 {
    let segments = dir.split('/').filter(|s| !s.is_empty()).count() as i32;
    let mut score = BASE_SCORE + segments * SEGMENT_WEIGHT;

    if let Some((_, bonus)) = CONTAINS_BONUSES.iter().find(|(p, _)| dir.contains(p)) {
        score -= bonus;
    }

    // Suffixes include the separator, so a top-level `web` gets no bonus
    if let Some((_, bonus)) = SUFFIX_BONUSES.iter().find(|(s, _)| dir.ends_with(s)) {
        score -= bonus;
    }

    score
}

/// Normalize, deduplicate, and sort candidates by ascending score
///
/// Ties keep their discovery order.
pub fn rank_root_candidates<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ranked: Vec<String> = Vec::new();
    for candidate in candidates {
        let dir = normalize_root_directory(candidate.as_ref());
        if dir.split('/').any(|segment| segment == "node_modules") {
            continue;
        }
        if !ranked.contains(&dir) {
            ranked.push(dir);
        }
    }

    ranked.sort_by_key(|dir| score_root_candidate(dir));
    ranked
}

/// Directories (relative to the repo root) that contain a `package.json`
pub fn collect_package_dirs(entries: &[RepoEntry]) -> Vec<String> {
    let mut dirs = Vec::new();
    if has_package_json(entries) {
        dirs.push(String::new());
    }
    collect_nested(entries, &mut dirs);
    dirs
}

fn has_package_json(entries: &[RepoEntry]) -> bool {
    entries
        .iter()
        .any(|e| e.kind == EntryKind::File && e.name == "package.json")
}

fn collect_nested(entries: &[RepoEntry], dirs: &mut Vec<String>) {
    for entry in entries {
        if entry.kind != EntryKind::Dir || entry.name == "node_modules" {
            continue;
        }
        if has_package_json(&entry.children) {
            dirs.push(entry.path.clone());
        }
        collect_nested(&entry.children, dirs);
    }
}

/// Ranked root-directory candidates for `owner/repo`, most preferred first
///
/// Returns an empty list when the tree cannot be read.
pub async fn resolve_root_directories<R: RepositorySource + ?Sized>(
    github: &R,
    owner: &str,
    repo: &str,
    depth: usize,
) -> Vec<String> {
    let tree = match github.get_repo_structure(owner, repo, "", depth).await {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(owner, repo, error = %e, "Could not scan repository tree");
            return Vec::new();
        }
    };

    let ranked = rank_root_candidates(collect_package_dirs(&tree));
    tracing::debug!(owner, repo, candidates = ?ranked, "Ranked root directory candidates");
    ranked
}
