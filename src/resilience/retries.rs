//! Retry logic.
//!
//! # Responsibilities
//! - Execute an operation up to a bounded number of attempts
//! - Sleep with exponential backoff + jitter between attempts
//! - Stop immediately on errors the caller classifies as final
//!
//! # Design Decisions
//! - Classification is the caller's: `FetchError::is_retryable` decides
//! - Cancellation is the caller's: wrap the whole retry in a select on shutdown

use std::future::Future;

use crate::resilience::backoff::Backoff;

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Runs `op` until it succeeds, fails with a final error, or attempts run out.
pub async fn retry<T, E, F, Fut, R>(policy: &RetryPolicy, is_retryable: R, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.backoff.delay(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
