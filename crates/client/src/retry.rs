//! Retry with linear backoff over a prioritized list of candidates.
//!
//! Used for best-effort operations where several backend endpoints can do
//! the same job (e.g. the cart-clear cascade after payment): each candidate
//! is retried up to `max_attempts` times before falling through to the next
//! one, and the first success wins.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per candidate (at least 1).
    pub max_attempts: u32,
    /// Delay after the first failed attempt; grows linearly.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: after failed attempt `n` wait `base_delay * n`.
    #[must_use]
    pub const fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 { 1 } else { self.max_attempts }
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 500 ms × attempt.
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(500))
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted.
///
/// `op` receives the 1-based attempt number. No delay follows the final
/// attempt.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                debug!(attempt, error = %e, "Attempt failed, backing off");
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// Try each candidate in order, retrying each per `policy`, and return the
/// first candidate that succeeds together with its result.
///
/// # Errors
///
/// Returns the final error of every candidate, in order, when all of them
/// fail. An empty candidate list yields an empty error list.
pub async fn first_success<'c, C, T, E, F, Fut>(
    policy: &RetryPolicy,
    candidates: &'c [C],
    mut op: F,
) -> Result<(&'c C, T), Vec<E>>
where
    C: Debug,
    F: FnMut(&'c C, u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failures = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match retry(policy, |attempt| op(candidate, attempt)).await {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => {
                warn!(candidate = ?candidate, error = %e, "Candidate exhausted its retries");
                failures.push(e);
            }
        }
    }
    Err(failures)
}
