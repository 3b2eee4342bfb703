/*!
 * Exponential backoff for outbound translation calls.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::app_config::TranslationConfig;
use crate::errors::TranslationError;

/// How often and how long a failing call is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each further retry
    pub base_delay: Duration,
    /// Upper bound on the sum of all backoff sleeps for one call
    pub max_total_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_total_wait: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_attempts: config.retry_count.max(1),
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_total_wait: Duration::from_secs(config.max_retry_wait_secs),
        }
    }

    /// Sleep before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `operation` until it succeeds, fails terminally or the policy is spent.
///
/// `operation` receives the 1-based attempt number. Errors that are not
/// retryable are returned as-is. When retries run out, a malformed response is
/// returned unchanged and any other error becomes `RetriesExhausted`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, TranslationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TranslationError>>,
{
    let mut waited = Duration::ZERO;
    let mut attempt = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => e,
        };

        let delay = policy.delay_for(attempt);
        let budget_left = waited + delay <= policy.max_total_wait;

        if attempt >= policy.max_attempts || !budget_left {
            return Err(match error {
                TranslationError::MalformedResponse(_) => error,
                other => TranslationError::RetriesExhausted {
                    attempts: attempt,
                    last_error: other.to_string(),
                },
            });
        }

        warn!(
            "{} failed (attempt {}/{}): {} - retrying in {}ms",
            label,
            attempt,
            policy.max_attempts,
            error,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        waited += delay;
        attempt += 1;
    }
}
