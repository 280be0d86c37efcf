use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackerError;

/// A unit of periodic work: one poll cycle of a tracker.
#[async_trait::async_trait]
pub trait PollingTask: Send + 'static {
    fn name(&self) -> &str;

    /// Run a single cycle. Long cycles should check `shutdown` between steps
    /// and return [`TrackerError::Cancelled`] once it fires.
    async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<(), TrackerError>;
}

/// A running polling worker.
pub struct WorkerHandle {
    name: String,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the worker to stop after its current step.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub async fn join(self) {
        match self.handle.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                tracing::error!(worker = %self.name, error = %e, "Worker task panicked");
            }
            Err(e) => {
                tracing::warn!(worker = %self.name, error = %e, "Worker task aborted");
            }
        }
    }
}

/// Await `call` unless `shutdown` fires first, in which case the call is
/// dropped mid-flight and [`TrackerError::Cancelled`] is returned.
pub async fn until_cancelled<T, E, F>(
    shutdown: &CancellationToken,
    call: F,
) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TrackerError>,
{
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Err(TrackerError::Cancelled),
        result = call => result.map_err(Into::into),
    }
}

/// Spawn `task` on its own tokio task, cancelled with `parent` or via [`WorkerHandle::stop`].
pub fn spawn_polling<T: PollingTask>(
    task: T,
    interval: Duration,
    parent: &CancellationToken,
) -> WorkerHandle {
    let shutdown = parent.child_token();
    let name = task.name().to_string();
    let handle = tokio::spawn(run_polling(task, interval, shutdown.clone()));

    WorkerHandle {
        name,
        shutdown,
        handle,
    }
}

/// Run cycles back to back, `interval` apart, until cancelled.
/// Cycle errors are logged; they never end the loop.
pub async fn run_polling<T: PollingTask>(
    mut task: T,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!(
        worker = task.name(),
        interval_ms = interval.as_millis() as u64,
        "Worker started"
    );

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match task.run_cycle(&shutdown).await {
            Ok(()) => {}
            Err(TrackerError::Cancelled) => break,
            Err(e) => {
                tracing::error!(worker = task.name(), error = %e, "Cycle failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => break,
        }
    }

    tracing::info!(worker = task.name(), "Worker stopped");
}
