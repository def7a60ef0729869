//! Sequential strategy execution with capped exponential backoff

use std::time::Duration;

use crate::deploy::strategy::DeployStrategy;
use crate::error::DeployError;
use crate::providers::HostingProvider;
use crate::shared::DeployResult;

/// Delay before the first retry
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Longest delay between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_millis(5000);

/// Delay between attempt `attempt` (0-based) and the next one
pub fn backoff_delay(attempt: usize) -> Duration {
    let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
    INITIAL_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Try `strategies` in order until one deploys
///
/// Strategies run strictly one after another since later ones may reuse the
/// project an earlier attempt created. With `enable_retry` off only the first
/// strategy runs and its error is returned unchanged.
pub async fn deploy_with_strategies<P: HostingProvider + ?Sized>(
    provider: &P,
    strategies: &[DeployStrategy],
    enable_retry: bool,
) -> Result<DeployResult, DeployError> {
    let Some(first) = strategies.first() else {
        return Err(DeployError::Validation(
            "no deployment strategies to try".to_string(),
        ));
    };

    if !enable_retry {
        tracing::info!(provider = %provider.kind(), strategy = %first.key, "Deploying without retry");
        let mut result = provider.deploy_from_github(&first.params).await?;
        result.strategy = Some(1);
        result.retries_used = Some(0);
        return Ok(result);
    }

    let total = strategies.len();
    let mut last_error: Option<DeployError> = None;

    for (attempt, strategy) in strategies.iter().enumerate() {
        tracing::info!(
            provider = %provider.kind(),
            attempt = attempt + 1,
            total,
            strategy = %strategy.key,
            label = %strategy.label,
            "Attempting deployment strategy"
        );

        match provider.deploy_from_github(&strategy.params).await {
            Ok(mut result) => {
                result.strategy = Some(attempt + 1);
                result.retries_used = Some(attempt);
                if attempt > 0 {
                    tracing::info!(
                        strategy = %strategy.key,
                        retries = attempt,
                        "Deployment succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    total,
                    strategy = %strategy.key,
                    error = %e,
                    "Deployment strategy failed"
                );

                if !e.is_retryable() {
                    return Err(e);
                }

                last_error = Some(e);

                if attempt + 1 < total {
                    let delay = backoff_delay(attempt);
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off before next strategy");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(DeployError::Exhausted {
        attempts: total,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}
