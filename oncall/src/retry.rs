//! Retry wrapper for remote mutating calls.
//!
//! A fixed number of attempts with a fixed sleep in between. There is no
//! backoff, no jitter and no error classification: every failure is retried
//! the same way and the last one is returned.
//!
//! ```text
//! attempt 1 ── ok ──────────────────────────────▶ Ok(value)
//!    │ err
//!    ├─ sleep(delay) ─ attempt 2 ── ok ─────────▶ Ok(value)
//!    │                    │ err
//!    ⋮                    ⋮
//! attempt N ── err ─────────────────────────────▶ Err(last error)
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempts and inter-attempt delay for [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 behaves like 1.
    pub attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Run `call` until it succeeds or the policy's attempts are exhausted.
///
/// `operation` only labels the warning logged for each retried failure.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_secs = policy.delay.as_secs_f64(),
                    error = %err,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
