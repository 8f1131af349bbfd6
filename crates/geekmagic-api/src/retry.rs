// Bounded retry with a per-attempt deadline.
//
// Every client operation goes through `retry()`. There is no overall
// deadline across attempts; each attempt gets the full timeout.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Error;

/// Retry budget for one endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Status queries and control calls: 2 attempts, 10s each.
    pub const fn query() -> Self {
        Self {
            max_attempts: 2,
            timeout: Duration::from_secs(10),
            delay: Duration::ZERO,
        }
    }

    /// Uploads: 2 attempts, 20s each.
    pub const fn upload() -> Self {
        Self {
            max_attempts: 2,
            timeout: Duration::from_secs(20),
            delay: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::query()
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// the budget is spent. The last error is returned as-is.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, endpoint: &str, mut attempt: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let max = policy.max_attempts.max(1);
    let mut n = 1;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                endpoint: endpoint.to_owned(),
                timeout_secs: policy.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || n >= max => return Err(e),
            Err(e) => {
                debug!(endpoint, attempt = n, error = %e, "retrying after error");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                n += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn refused() -> Error {
        Error::transport("app.json", "connection refused")
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_after_second_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), Error> = retry(RetryPolicy::query(), "app.json", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(refused())
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = retry(RetryPolicy::query(), "app.json", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(refused())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn not_found_is_returned_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), Error> = retry(RetryPolicy::query(), "v.json", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::NotFound {
                    endpoint: "v.json".into(),
                })
            }
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy::query().with_timeout(Duration::from_millis(50));
        let result: Result<(), Error> = retry(policy, "brt.json", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(Error::Timeout { ref endpoint, .. }) if endpoint == "brt.json"
        ));
    }
}
