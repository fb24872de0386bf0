use crate::error::ModelError;
use std::{future::Future, time::Duration};
use tracing::warn;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF: u32 = 2;

/// How many times and how often to retry a failed request.
///
/// The delay before attempt `n + 1` is `delay * backoff^(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: u32,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// A policy that runs the request exactly once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

/// Run `op` until it succeeds, returns a non retryable error,
/// or the policy runs out of attempts.
///
/// * `policy`: Retry policy.
/// * `what`: Operation name used in log output.
/// * `op`: Produces the future to run on every attempt.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, ModelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.delay;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                warn!("{what} failed (attempt {attempt}/{attempts}): {e}; retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                delay = delay.checked_mul(policy.backoff).unwrap_or(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing_test::traced_test;

    fn server_error() -> ModelError {
        ModelError::Status {
            url: "http://test".to_string(),
            status: 503,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn retry_stops_on_success() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = retry(&policy, "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                Err(server_error())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(42, result.unwrap());
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    #[traced_test]
    async fn retry_gives_up_after_attempts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result: Result<(), _> = retry(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(server_error())
        })
        .await;

        assert!(matches!(result, Err(ModelError::Status { status: 503, .. })));
        assert_eq!(3, calls.load(Ordering::SeqCst));
        assert!(logs_contain("test failed (attempt 2/3)"));
    }

    #[tokio::test]
    async fn retry_skips_permanent_errors() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let result: Result<(), _> = retry(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ModelError::EmptyEmbedding)
        })
        .await;

        assert!(matches!(result, Err(ModelError::EmptyEmbedding)));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }
}
