use crate::ports::{RepositoryError, RepositoryResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Finished successfully, stop.
    Done(T),
    /// Finished with an error that another attempt won't fix.
    Fail(RepositoryError),
    /// Transient failure, try again after backing off.
    Retry(RepositoryError),
}

impl<T> Attempt<T> {
    pub fn classify(result: RepositoryResult<T>) -> Self {
        match result {
            Ok(value) => Attempt::Done(value),
            Err(e) => Attempt::from_error(e),
        }
    }

    pub fn from_error(error: RepositoryError) -> Self {
        if error.is_transient() {
            Attempt::Retry(error)
        } else {
            Attempt::Fail(error)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_wait: Duration,
    /// Wall-clock budget across all attempts. Zero disables the check.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_wait: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Overwrites only the positive settings, zero keeps what was there.
    pub fn update(&mut self, max_attempts: u32, base_wait: Duration, max_elapsed: Duration) {
        if max_attempts > 0 {
            self.max_attempts = max_attempts;
        }
        if !base_wait.is_zero() {
            self.base_wait = base_wait;
        }
        if !max_elapsed.is_zero() {
            self.max_elapsed = max_elapsed;
        }
    }

    /// `base_wait * 2^attempt` plus uniform jitter in `[0, base_wait)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let exponential = self.base_wait.saturating_mul(factor);

        let span = self.base_wait.as_nanos().min(u64::MAX as u128) as u64;
        let jitter = if span == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rand::thread_rng().gen_range(0..span))
        };

        exponential.saturating_add(jitter)
    }

    /// Drives `op` until it finishes, fails terminally, runs out of attempts
    /// or blows the elapsed budget. `op` receives the zero-based attempt index
    /// and must build its request from scratch each time.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> RepositoryResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let start = Instant::now();
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match op(attempt).await {
                Attempt::Done(value) => {
                    if attempt > 0 {
                        tracing::debug!("{} succeeded on attempt {}", operation, attempt + 1);
                    }
                    return Ok(value);
                }
                Attempt::Fail(e) => {
                    tracing::warn!("{} failed: {}", operation, e);
                    return Err(e);
                }
                Attempt::Retry(e) => {
                    tracing::warn!(
                        "{} attempt {}/{} failed: {}",
                        operation,
                        attempt + 1,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }

            if !self.max_elapsed.is_zero() && start.elapsed() > self.max_elapsed {
                tracing::warn!(
                    "{} gave up after {:?}, retry budget is {:?}",
                    operation,
                    start.elapsed(),
                    self.max_elapsed
                );
                return Err(RepositoryError::RetryBudgetExceeded(self.max_elapsed));
            }

            if attempt + 1 < attempts {
                sleep(self.backoff(attempt)).await;
            }
        }

        let error = last_error.unwrap_or(RepositoryError::RetriesExhausted);
        tracing::warn!("{} failed after {} attempts: {}", operation, attempts, error);
        Err(error)
    }
}
