//! Bounded retry for vendor calls
//!
//! Delays follow an exponential schedule (initial delay, doubling, no
//! jitter). The retrier never sleeps after the final attempt and never
//! sleeps past the caller's deadline.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Default attempt count for vendor calls
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default first retry delay
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(300);

/// Retry policy: attempt count plus first delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrier {
    attempts: u32,
    initial_delay: Duration,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_INITIAL_DELAY)
    }
}

impl Retrier {
    /// Create a retrier. Zero values fall back to the defaults.
    #[must_use]
    pub fn new(attempts: u32, initial_delay: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { DEFAULT_ATTEMPTS } else { attempts },
            initial_delay: if initial_delay.is_zero() {
                DEFAULT_INITIAL_DELAY
            } else {
                initial_delay
            },
        }
    }

    /// Maximum number of attempts
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the second attempt
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the last error on exhaustion. When `deadline` is set and the
    /// next delay would end past it, the last error is returned right away.
    pub async fn run<T, E, F, Fut>(&self, deadline: Option<Instant>, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut schedule = self.schedule();
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= self.attempts {
                debug!(attempt, error = %err, "Operation failed, no more retries");
                return Err(err);
            }

            let delay = schedule.next_backoff().unwrap_or(self.initial_delay);
            if let Some(deadline) = deadline {
                if Instant::now() + delay >= deadline {
                    debug!(attempt, error = %err, "Retry delay exceeds deadline");
                    return Err(err);
                }
            }

            warn!(
                attempt,
                max_attempts = self.attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Operation failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
