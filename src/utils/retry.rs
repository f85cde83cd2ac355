//! Retry with exponential backoff for outbound provider calls.
//!
//! Every adapter wraps its network round-trips in [`with_retry`]. A
//! not-found response fails immediately; rate limits, other non-2xx
//! statuses, and transport failures are retried until attempts run out.

use std::time::Duration;

use tokio::time::sleep;

use crate::providers::ProviderError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that retries without waiting, for tests
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 2.0,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Whether an error is worth retrying.
///
/// Not-found is a definitive answer from the provider; parse and request
/// construction failures will not change on a second attempt.
pub fn is_transient(error: &ProviderError) -> bool {
    matches!(
        error,
        ProviderError::Network(_) | ProviderError::Api(_) | ProviderError::RateLimit(_)
    )
}

/// Execute an async operation, retrying transient failures with
/// exponential backoff.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "call succeeded after retries");
                }
                return Ok(result);
            }
            Err(error) if is_transient(&error) && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    %error,
                    "transient failure, retrying"
                );
                sleep(delay).await;
            }
            Err(error) => {
                if attempt > 1 {
                    tracing::warn!(attempt, %error, "call failed after retries");
                }
                return Err(error);
            }
        }
    }
}
