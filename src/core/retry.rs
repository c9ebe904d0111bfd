//! Retry logic with exponential backoff and jitter.
//!
//! Used by the API adapters to ride out rate limiting and transient server
//! errors. Callers above the adapters never see a retry; they see either
//! the eventual success or the last error.

use std::future::Future;
use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 0, ..Default::default() }
    }

    /// Create a config for remote API calls.
    pub fn network() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Calculate delay for the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0) without external deps.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// Whether the failed operation may be attempted again.
    fn is_retryable(&self) -> bool;

    /// Server-requested wait before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while it fails with a retryable error.
///
/// A server-provided `Retry-After` wins over the computed backoff but is
/// still capped at `max_delay`.
pub async fn retry_async<T, E, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1; // +1 for initial attempt

    loop {
        attempts += 1;
        let result = operation().await;

        let retry_delay = match &result {
            Err(err) if attempts < max_attempts && err.is_retryable() => {
                let delay = err.retry_after().map_or_else(
                    || config.delay_for_attempt(attempts),
                    |d| d.min(config.max_delay),
                );
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying request"
                );
                Some(delay)
            }
            _ => None,
        };

        match retry_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return RetryResult { result, attempts, total_time: start.elapsed() },
        }
    }
}
