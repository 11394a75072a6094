//! Retry utilities with exponential backoff for resilient API calls.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay for a given (1-based) attempt number
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay;
        }
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(f64::from(attempt) - 1.0);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issue
    Network,
    /// Rate limit exceeded
    RateLimit,
    /// Server-side error (5xx)
    ServerError,
    /// Request timed out
    Timeout,
}

impl TransientError {
    /// Classify a [`SourceError`]; `None` means permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Timeout => Some(TransientError::Timeout),
            SourceError::Api(msg) => {
                let msg = msg.to_lowercase();
                if msg.contains("timeout") {
                    Some(TransientError::Timeout)
                } else if msg.contains("unavailable") || msg.contains("server error") {
                    Some(TransientError::ServerError)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Minimum delay appropriate for this error class
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::RateLimit => Duration::from_secs(5),
            TransientError::ServerError => Duration::from_secs(2),
            TransientError::Timeout => Duration::from_secs(2),
            TransientError::Network => Duration::from_secs(1),
        }
    }
}

/// Execute an async operation, retrying on transient errors with exponential
/// backoff. Permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(attempts, "operation succeeded after transient failures");
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts {
                    tracing::warn!(attempts, %error, "operation failed after retries");
                    return Err(error);
                }

                let delay = std::cmp::max(
                    config.delay_for_attempt(attempts),
                    transient.recommended_delay(),
                );
                tracing::debug!(attempts, ?transient, ?delay, "transient error, retrying");
                sleep(delay).await;
            }
        }
    }
}

/// Retry configuration tuned for external literature APIs
pub fn api_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = {
            let calls = calls.clone();
            with_retry(fast_config(), move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = {
            let calls = calls.clone();
            with_retry(fast_config(), move || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(SourceError::Network("temporary".to_string()))
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<&str, SourceError> = {
            let calls = calls.clone();
            with_retry(fast_config(), move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SourceError::InvalidRequest("bad query".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_classification() {
        assert_eq!(
            TransientError::from_source_error(&SourceError::RateLimit),
            Some(TransientError::RateLimit)
        );
        assert_eq!(
            TransientError::from_source_error(&SourceError::Timeout),
            Some(TransientError::Timeout)
        );
        assert!(
            TransientError::from_source_error(&SourceError::Parse("bad xml".to_string())).is_none()
        );
    }

    #[test]
    fn test_backoff_delays_grow() {
        let config = RetryConfig::default();
        assert!(config.delay_for_attempt(3) > config.delay_for_attempt(2));
        assert!(config.delay_for_attempt(10) <= config.max_delay);
    }
}
