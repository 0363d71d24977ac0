// src/retry.rs

//! Bounded retry with exponential backoff for backend calls that are safe to
//! repeat (create, describe).

use crate::config::RetryConfig;
use crate::error::BackendError;

use std::future::Future;

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
///
/// A policy of 0 or 1 attempts runs `op` exactly once.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "{what} failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
