//! Bounded retry for backend calls
//!
//! A capped exponential schedule on top of the `backoff` crate: the first
//! attempt runs immediately, each retry waits twice as long as the previous
//! one, and the call gives up after `max_attempts` attempts.

use crate::error::{classify_failure, Error, FailureClass, Result};
use backoff::backoff::Backoff;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

// =============================================================================
// Retry Policy
// =============================================================================

/// Retry schedule for backend calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

/// Exponential backoff that stops after a fixed number of retries
#[derive(Debug, Clone)]
pub struct CappedExponentialBackoff {
    policy: RetryPolicy,
    retries: u32,
    current: Duration,
}

impl CappedExponentialBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        let current = policy.initial_delay;
        Self {
            policy,
            retries: 0,
            current,
        }
    }
}

impl Backoff for CappedExponentialBackoff {
    fn reset(&mut self) {
        self.retries = 0;
        self.current = self.policy.initial_delay;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.policy.max_attempts {
            return None;
        }
        let delay = self.current;
        self.retries += 1;
        self.current = delay.saturating_mul(self.policy.multiplier);
        Some(delay)
    }
}

// =============================================================================
// Retry Helper
// =============================================================================

/// Run `operation` under `policy`.
///
/// Retryable failures are attempted again until the policy is exhausted,
/// then reported as [`Error::BackendUnavailable`]. Fatal failures return
/// immediately, unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, url: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = AtomicU32::new(0);

    let result = backoff::future::retry_notify(
        CappedExponentialBackoff::new(policy.clone()),
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Attempt {}/{} on {} ...", attempt, policy.max_attempts, url);
            let call = operation();
            async move {
                call.await.map_err(|err| match classify_failure(&err) {
                    FailureClass::Retryable => backoff::Error::transient(err),
                    FailureClass::Fatal => backoff::Error::permanent(err),
                })
            }
        },
        |err: Error, delay: Duration| {
            warn!(
                "Unable to contact {} - {}s to the next attempt ... ({})",
                url,
                delay.as_secs_f64(),
                err
            );
        },
    )
    .await;

    result.map_err(|err| {
        if err.is_retryable() {
            let attempts = attempts.load(Ordering::SeqCst);
            error!("Unable to contact {} after {} attempts", url, attempts);
            Error::BackendUnavailable {
                url: url.to_string(),
                attempts,
                reason: err.to_string(),
            }
        } else {
            err
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            multiplier: 2,
        }
    }

    fn unavailable() -> Error {
        Error::BackendStatus {
            url: "http://backend".into(),
            status: 503,
        }
    }

    #[test]
    fn test_schedule_doubles_and_stops() {
        let mut backoff = CappedExponentialBackoff::new(RetryPolicy::default());
        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_backoff()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(), "http://backend", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_matches!(result, Err(Error::BackendUnavailable { attempts: 5, .. }));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(), "http://backend", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(unavailable())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(), "http://backend", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::MalformedResponse {
                    url: "http://backend".into(),
                    reason: "not json".into(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_matches!(result, Err(Error::MalformedResponse { .. }));
    }
}
