//! Environment variable reconciliation
//!
//! The desired set is authoritative for the keys it names: every existing
//! variable with a matching key is deleted, then each desired variable is
//! recreated. Keys the desired set does not mention are left alone.

use anyhow::Result;

use crate::providers::HostingProvider;
use crate::shared::EnvVar;

/// Trim keys, drop empty ones, and keep the last value for duplicate keys
///
/// Order follows each key's first appearance.
pub fn normalize_env_vars(desired: &[EnvVar]) -> Vec<EnvVar> {
    let mut normalized: Vec<EnvVar> = Vec::with_capacity(desired.len());

    for var in desired {
        let key = var.key.trim();
        if key.is_empty() {
            continue;
        }
        let var = EnvVar {
            key: key.to_string(),
            ..var.clone()
        };
        match normalized.iter_mut().find(|existing| existing.key == var.key) {
            Some(existing) => *existing = var,
            None => normalized.push(var),
        }
    }

    normalized
}

/// Bring `project_id`'s variables for the desired keys to exactly `desired`
///
/// Deletes are best-effort; creates propagate their errors. Returns the number
/// of variables created. Does nothing, not even a listing, when `desired` is empty.
pub async fn reconcile_env_vars<P: HostingProvider + ?Sized>(
    provider: &P,
    project_id: &str,
    desired: &[EnvVar],
) -> Result<usize> {
    let desired = normalize_env_vars(desired);
    if desired.is_empty() {
        return Ok(0);
    }

    let existing = provider.list_env_vars(project_id).await?;

    for remote in existing
        .iter()
        .filter(|remote| desired.iter().any(|d| d.key == remote.key))
    {
        if let Err(e) = provider.delete_env_var(project_id, &remote.id).await {
            tracing::warn!(
                provider = %provider.kind(),
                project_id,
                key = %remote.key,
                error = %e,
                "Failed to delete env var, recreating anyway"
            );
        }
    }

    for var in &desired {
        provider.create_env_var(project_id, var).await?;
    }

    tracing::info!(
        provider = %provider.kind(),
        project_id,
        count = desired.len(),
        "Environment variables reconciled"
    );

    Ok(desired.len())
}
