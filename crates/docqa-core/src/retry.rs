//! Bounded exponential backoff for transient provider failures.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Retry policy for external embedding/LLM calls. Only errors flagged
/// retryable (rate limits, timeouts, 5xx) are retried; everything else, and
/// the final attempt's error, is returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

impl Backoff {
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "transient failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
