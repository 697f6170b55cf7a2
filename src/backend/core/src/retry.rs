//! Retrying executor with pluggable backoff.
//!
//! Used to bring the scheduler up: acquiring the engine handle can fail
//! transiently, so startup goes through [`RetryPolicy::startup`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Backoff Strategies
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed { delay: Duration },
    /// `initial + increment * n`
    Linear { initial: Duration, increment: Duration },
    /// `initial * multiplier^n`, capped at `max`
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl BackoffStrategy {
    /// Delay before retry `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Linear { initial, increment } => *initial + increment.saturating_mul(retry),
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let secs = initial.as_secs_f64() * multiplier.powi(retry as i32);
                Duration::from_secs_f64(secs.min(max.as_secs_f64()))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Retry Policy
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: E,
    },

    #[error("{operation} cancelled after {attempts} attempts")]
    Cancelled { operation: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = run once)
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(0, BackoffStrategy::Fixed { delay: Duration::ZERO })
    }

    /// Startup preset: 3 retries after 1s, 2s and 3s.
    pub fn startup() -> Self {
        Self::new(
            3,
            BackoffStrategy::Linear {
                initial: Duration::from_secs(1),
                increment: Duration::from_secs(1),
            },
        )
    }

    /// Run `action` until it succeeds, retries run out, or `cancel` fires
    /// during a backoff wait.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut action: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match action().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if attempt > self.max_retries => {
                    return Err(RetryError::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_error: error,
                    });
                }
                Err(error) => {
                    let delay = self.backoff.delay_for_retry(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        error = %error,
                        "Attempt failed, retrying"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(RetryError::Cancelled {
                                operation: operation.to_string(),
                                attempts: attempt,
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::startup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_backoff_delays() {
        let linear = RetryPolicy::startup().backoff;
        let delays: Vec<u64> = (0..3).map(|n| linear.delay_for_retry(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 3]);

        let exponential = BackoffStrategy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            multiplier: 2.0,
        };
        assert_eq!(exponential.delay_for_retry(2), Duration::from_secs(4));
        assert_eq!(exponential.delay_for_retry(5), Duration::from_secs(5));

        let fixed = BackoffStrategy::Fixed {
            delay: Duration::from_millis(250),
        };
        assert_eq!(fixed.delay_for_retry(7), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_retries_three_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), _> = RetryPolicy::startup()
            .execute("connect", &CancellationToken::new(), || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("unreachable")
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 4, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_later_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::startup()
            .execute("connect", &CancellationToken::new(), || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), _> = RetryPolicy::startup()
            .execute("connect", &cancel, || async { Err::<(), _>("down") })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_no_retry_runs_once() {
        let result: Result<(), _> = RetryPolicy::no_retry()
            .execute("once", &CancellationToken::new(), || async { Err::<(), _>("boom") })
            .await;

        match result {
            Err(RetryError::Exhausted {
                attempts,
                last_error,
                ..
            }) => {
                assert_eq!(attempts, 1);
                assert_eq!(last_error, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
