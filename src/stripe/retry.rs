//! Linear back-off on Stripe rate limiting.
//!
//! Only HTTP 429 is retried. Every other error is returned as-is so the
//! caller can log it against the row and move on.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::stripe::StripeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based): `attempt × backoff_base`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }
}

/// Runs `operation`, retrying up to `policy.max_retries` more times while it
/// reports [`StripeError::RateLimited`].
pub async fn with_rate_limit_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, StripeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StripeError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay(attempt);
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Stripe rate limit, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
