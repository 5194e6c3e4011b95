//! Caller-side retry policy for page requests.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Wait the same time before every retry
    Fixed { delay_ms: u64 },
    /// Double the delay after every retry, up to a ceiling
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// Delay before retry number `retry` (starting at 1)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { initial_ms, max_ms } => {
                let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

/// Bounded retry for page requests
///
/// Only failures that `PageError::is_retryable` reports as transient are
/// retried. There is always a finite number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                initial_ms: 250,
                max_ms: 4_000,
            },
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts. Returns the last error.
    pub fn run<R, F>(&self, operation: F) -> Result<R, PageError>
    where
        F: FnMut() -> Result<R, PageError>,
    {
        self.run_with_sleep(operation, std::thread::sleep)
    }

    fn run_with_sleep<R, F, S>(&self, mut operation: F, mut sleep: S) -> Result<R, PageError>
    where
        F: FnMut() -> Result<R, PageError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::warn!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, error = %error, "page request failed, retrying");
                    sleep(delay);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, StoreError};

    fn transient() -> PageError {
        PageError::RemoteFetchFailed(RemoteError::Transport("reset".to_string()))
    }

    #[test]
    fn exponential_backoff_doubles_up_to_ceiling() {
        let backoff = Backoff::Exponential {
            initial_ms: 100,
            max_ms: 350,
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(80), Duration::from_millis(350));
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::Fixed { delay_ms: 10 },
        };
        let mut calls = 0;
        let mut slept = Vec::new();

        let result = policy.run_with_sleep(
            || {
                calls += 1;
                if calls < 3 {
                    Err(transient())
                } else {
                    Ok(calls)
                }
            },
            |d| slept.push(d),
        );

        assert_eq!(result.unwrap(), 3);
        assert_eq!(slept, vec![Duration::from_millis(10); 2]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Backoff::None,
        };
        let mut calls = 0;

        let result: Result<(), _> = policy.run_with_sleep(
            || {
                calls += 1;
                Err(transient())
            },
            |_| {},
        );

        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let mut calls = 0;

        let result: Result<(), _> = RetryPolicy::default().run_with_sleep(
            || {
                calls += 1;
                Err(PageError::LocalStoreFailed(StoreError::QueryFailed("disk".into())))
            },
            |_| {},
        );

        assert!(matches!(result, Err(PageError::LocalStoreFailed(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Backoff::None,
        };
        let mut calls = 0;
        let _ = policy.run_with_sleep(
            || {
                calls += 1;
                Err::<(), _>(transient())
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
