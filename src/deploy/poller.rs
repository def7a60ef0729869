//! Deployment status polling with timeout and cancellation

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::DeployError;
use crate::providers::HostingProvider;
use crate::shared::{Deployment, DeploymentRef};

/// Poll budget and cadence
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Give up after this much wall-clock time
    pub timeout: Duration,
    /// Pause between status fetches
    pub interval: Duration,
}

impl PollOptions {
    /// Provider defaults: 6 min / 2.5 s for Vercel, 10 min / 3 s for Render
    pub fn for_provider<P: HostingProvider + ?Sized>(provider: &P) -> Self {
        let (timeout, interval) = provider.poll_defaults();
        Self { timeout, interval }
    }
}

/// Triggers cancellation of every [`AbortSignal`] cloned from it
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

/// Cancellation signal observed by the poller
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortHandle {
    pub fn channel() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx })
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl AbortSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once aborted; stays pending forever if the handle is dropped first
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Poll `deployment` until it reaches a terminal state
///
/// `on_update` sees every fetched snapshot, including the terminal one. An
/// abort interrupts both an in-flight fetch and the sleep between polls.
pub async fn poll_deployment<P, F>(
    provider: &P,
    deployment: &DeploymentRef,
    options: PollOptions,
    mut on_update: F,
    mut abort: AbortSignal,
) -> Result<Deployment, DeployError>
where
    P: HostingProvider + ?Sized,
    F: FnMut(&Deployment),
{
    let started = Instant::now();

    loop {
        if abort.is_aborted() {
            return Err(DeployError::Cancelled);
        }

        let fetched = tokio::select! {
            _ = abort.aborted() => return Err(DeployError::Cancelled),
            fetched = provider.get_deployment(deployment) => fetched?,
        };

        let current = fetched
            .ok_or_else(|| DeployError::NotFound(format!("deployment {}", deployment.id)))?;

        on_update(&current);

        if provider.is_terminal(&current.status) {
            tracing::info!(
                provider = %provider.kind(),
                deployment_id = %current.id,
                status = %current.status,
                elapsed_secs = started.elapsed().as_secs(),
                "Deployment reached terminal state"
            );
            return Ok(current);
        }

        let elapsed = started.elapsed();
        if elapsed >= options.timeout {
            tracing::warn!(
                deployment_id = %deployment.id,
                status = %current.status,
                elapsed_secs = elapsed.as_secs(),
                "Deployment polling timed out"
            );
            return Err(DeployError::PollTimeout {
                deployment_id: deployment.id.clone(),
                elapsed,
            });
        }

        tracing::debug!(deployment_id = %deployment.id, status = %current.status, "Deployment in progress");

        tokio::select! {
            _ = abort.aborted() => return Err(DeployError::Cancelled),
            _ = tokio::time::sleep(options.interval) => {}
        }
    }
}
