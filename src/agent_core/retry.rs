//! Rate-limit retry for model calls.
//!
//! Only `RateLimited` is retried. Every other error propagates on the first
//! attempt.

use std::future::Future;
use std::time::Duration;

use crate::inference::InferenceError;

// ─── Policy ─────────────────────────────────────────────────────────────────

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}

// ─── Execution ──────────────────────────────────────────────────────────────

/// Run `op` until it succeeds, fails with a non-rate-limit error, or the
/// attempts run out. The last `RateLimited` error is returned when exhausted.
pub async fn retry_on_rate_limit<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, InferenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InferenceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_rate_limited() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    call = label,
                    attempt,
                    retries_left = policy.max_attempts - attempt,
                    delay_ms = delay.as_millis() as u64,
                    "model rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
