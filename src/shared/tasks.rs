use std::future::Future;

/// Run a future as a detached task whose error is logged, never surfaced
///
/// Returns a handle to the spawned task.
pub fn spawn_logged<F>(name: &'static str, fut: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match fut.await {
            Ok(()) => tracing::debug!(task = name, "Background task finished"),
            Err(e) => tracing::warn!(task = name, error = %e, "Background task failed"),
        }
    })
}
