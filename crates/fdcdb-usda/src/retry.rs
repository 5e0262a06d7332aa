//! Fixed-delay retry loop for detail fetches.
//!
//! [`retry_with_progress`] runs an operation up to `max_attempts` times,
//! sleeping a fixed delay between attempts. Errors that a retry cannot fix
//! (bad input, malformed payloads, provider 4xx) end the loop immediately.

use std::future::Future;
use std::time::Duration;

use fdcdb_core::AppConfig;

use crate::error::FoodDataError;

/// Total attempts per detail request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(400);

/// Callback invoked before each retry with the number of the attempt about to run (2, 3, ...).
pub type RetryProgress<'a> = &'a (dyn Fn(u32) + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is raised to 1 if zero.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

/// Returns `true` for errors that are worth another attempt.
///
/// **Retriable:** transport failures, empty payloads, and provider failures
/// with status 0 (unknown), 408, 429, or 5xx.
///
/// **Not retriable:** other provider statuses, deserialization failures, and
/// invalid input.
pub(crate) fn is_retriable(err: &FoodDataError) -> bool {
    match err {
        FoodDataError::Http(_) | FoodDataError::EmptyPayload { .. } => true,
        FoodDataError::Provider { status, .. } => {
            matches!(*status, 0 | 408 | 429) || *status >= 500
        }
        FoodDataError::Deserialize { .. }
        | FoodDataError::InvalidInput(_)
        | FoodDataError::MissingProxyUrl => false,
    }
}

/// Runs `operation` until it succeeds, fails with a non-retriable error, or
/// `policy.max_attempts` attempts have failed. The last error is returned.
///
/// `on_retry` fires after the delay and before every attempt except the first.
pub(crate) async fn retry_with_progress<T, F, Fut>(
    policy: RetryPolicy,
    on_retry: Option<RetryProgress<'_>>,
    mut operation: F,
) -> Result<T, FoodDataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FoodDataError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = policy.delay.as_millis() as u64;
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "detail fetch failed, retrying after fixed delay"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
                if let Some(callback) = on_retry {
                    callback(attempt);
                }
            }
        }
    }
}
