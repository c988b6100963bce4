//! Retry with backoff
//!
//! [`execute_with_retries`] runs an async operation until it succeeds, the
//! retry predicate rejects the error, or the attempts run out.
//! [`execute_with_retries_safe`] never fails: the last error is captured
//! through the [`ObservabilitySink`] and `None` is returned.

use crate::config::RetryConfig;
use crate::domain::HieError;
use crate::log_retry_attempt;
use crate::logging::{ErrorContext, ObservabilitySink};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempts and delays of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Same delay between every attempt
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay before the retry that follows attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let delay_ms = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

/// Run `operation` with retries
///
/// # Arguments
///
/// * `policy` - Attempts and delays
/// * `operation_name` - Name used in retry logs
/// * `operation` - Produces a fresh future per attempt
/// * `should_retry` - Whether an error is worth another attempt
///
/// # Errors
///
/// Returns the last error once attempts are exhausted or `should_retry`
/// returns false.
pub async fn execute_with_retries<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts || !should_retry(&e) {
                    return Err(e);
                }

                let delay = policy.delay_after(attempt);
                log_retry_attempt!(attempt, max_attempts, operation_name, e);
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Like [`execute_with_retries`], but logs the final error and returns `None`
pub async fn execute_with_retries_safe<T, F, Fut, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
    should_retry: P,
    sink: &dyn ObservabilitySink,
    context: &ErrorContext,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HieError>>,
    P: Fn(&HieError) -> bool,
{
    match execute_with_retries(policy, operation_name, operation, should_retry).await {
        Ok(value) => Some(value),
        Err(e) => {
            sink.capture_error(&e, context);
            None
        }
    }
}
