use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::NetworkConfig;
use crate::error::ChainError;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            retries: config.rpc_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Bound a single node call in time, folding its error into a [`ChainError`].
pub async fn with_timeout<T, E, F>(op: &'static str, after: Duration, call: F) -> Result<T, ChainError>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(after, call).await {
        Ok(Ok(val)) => Ok(val),
        Ok(Err(e)) => Err(ChainError::Rpc {
            op,
            message: e.to_string(),
        }),
        Err(_) => Err(ChainError::Timeout { op, after }),
    }
}

/// Retry an async operation with exponential backoff.
/// Only transient errors (timeouts, transport failures) are retried.
///
/// Both the call and the backoff sleep race `shutdown`; once it fires the
/// call is dropped and [`ChainError::Cancelled`] is returned.
pub async fn retry_rpc<F, Fut, T>(
    policy: &RetryPolicy,
    op: &'static str,
    shutdown: &CancellationToken,
    mut f: F,
) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut delay = policy.initial_backoff;
    let mut attempt = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(ChainError::Cancelled { op }),
            result = f() => result,
        };

        match result {
            Ok(val) => return Ok(val),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                attempt += 1;
                tracing::warn!(
                    op,
                    attempt,
                    max_retries = policy.retries,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "RPC call failed, retrying..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.cancelled() => return Err(ChainError::Cancelled { op }),
                }
                delay = std::cmp::min(delay * 2, policy.max_backoff);
            }
            Err(e) => return Err(e),
        }
    }
}
