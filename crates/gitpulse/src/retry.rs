//! Shared retry utility for remote calls.
//!
//! Every network operation of a harvesting run (project pages, project
//! handles, branch lists, commit lists, commit details) goes through
//! [`with_retry`] so the attempt ceiling and pause are identical everywhere.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::harvest::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS};

/// Configuration for retry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Build a constant backoff strategy from this configuration.
    ///
    /// backon counts retries, not attempts, so the first call is subtracted.
    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Execute an operation, retrying errors accepted by `is_retryable`.
///
/// * `operation` - the async call to retry; invoked once per attempt.
/// * `is_retryable` - decides whether a failed attempt is worth repeating.
/// * `short_message` - extracts a one-line message for logging.
/// * `label` - what is being fetched, for log context.
///
/// The last error is returned once attempts are exhausted or a
/// non-retryable error occurs.
///
/// # Example
///
/// ```ignore
/// use gitpulse::retry::{RetryConfig, with_retry};
/// use gitpulse::platform::short_error_message;
///
/// let branches = with_retry(
///     || async { client.list_branches_page(project_id, 1, 100).await },
///     |e: &PlatformError| e.is_transient(),
///     short_error_message,
///     "branches of group/app",
///     RetryConfig::default(),
/// )
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut, IsRetryable, ShortMsg>(
    mut operation: F,
    is_retryable: IsRetryable,
    short_message: ShortMsg,
    label: &str,
    config: RetryConfig,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
    IsRetryable: Fn(&E) -> bool + Send + Sync + 'static,
    ShortMsg: Fn(&E) -> String + Send + Sync + 'static,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::debug!(
                what = label,
                attempt = attempt.load(Ordering::SeqCst),
                max_attempts = config.max_attempts,
                "Retrying in {:?}: {}",
                dur,
                short_message(err)
            );
        })
        .when(is_retryable)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_retry_config_default_is_three_attempts_three_seconds_apart() {
        let config = RetryConfig::default();
        assert_eq!(config.delay, Duration::from_secs(3));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_retry_config_custom() {
        let config = RetryConfig::new(Duration::from_secs(2), 5);
        assert_eq!(config.delay, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 5);
        let _backoff = config.into_backoff();
    }

    #[derive(Debug, Clone)]
    struct TestError {
        message: &'static str,
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for TestError {}

    fn counting_operation(
        calls: &Arc<AtomicU32>,
        fail_times: u32,
        transient: bool,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, TestError>> + Send>>
    {
        let calls = Arc::clone(calls);
        move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < fail_times {
                    Err(TestError {
                        message: "server error",
                        transient,
                    })
                } else {
                    Ok(42u32)
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result = with_retry(
            counting_operation(&calls, 2, true),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "page 1",
            RetryConfig::default(),
        )
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two fixed pauses of three seconds each.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(7), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));

        let err = with_retry(
            counting_operation(&calls, u32::MAX, true),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "page 1",
            RetryConfig::default(),
        )
        .await
        .expect_err("all attempts fail");

        assert_eq!(err.to_string(), "server error");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));

        let err = with_retry(
            counting_operation(&calls, u32::MAX, false),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "project 7",
            RetryConfig::default(),
        )
        .await
        .expect_err("expected error");

        assert_eq!(err.to_string(), "server error");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_single_attempt_when_ceiling_is_one() {
        let calls = Arc::new(AtomicU32::new(0));

        let _ = with_retry(
            counting_operation(&calls, u32::MAX, true),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "project 7",
            RetryConfig::new(Duration::from_secs(1), 1),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
