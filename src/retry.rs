//! Retry policy for filesystem operations that can fail transiently.
//!
//! Only permission-denied errors are retried: on Windows they are what a
//! file held open by another process produces, and they usually clear
//! within a few hundred milliseconds. Every other error kind is returned
//! immediately.

use serde::Deserialize;
use std::io;
use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles on each retry, capped at 32x the base delay.
    Exponential,
}

/// What to do once all attempts failed with a retryable error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// Remove the item permanently, bypassing the trash.
    #[default]
    Remove,
    /// Leave the item in place and report it.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    pub fallback: Fallback,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
            backoff: Backoff::Fixed,
            fallback: Fallback::Remove,
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation succeeded within the allowed attempts.
    Done(T),
    /// Every attempt hit a retryable error; the fallback should run.
    Exhausted(io::Error),
    /// A non-retryable error ended the loop early.
    Failed(io::Error),
}

impl RetryPolicy {
    /// Delay to wait before attempt number `attempt` (0-based; attempt 0
    /// never waits).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => self.delay * (1u32 << (attempt - 1).min(5)),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached.
    pub fn run<T, F>(&self, mut op: F) -> Attempt<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        let mut last_err = None;

        for attempt in 0..self.max_attempts.max(1) {
            let wait = self.delay_before(attempt);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            match op() {
                Ok(v) => return Attempt::Done(v),
                Err(e) if is_retryable(&e) => {
                    tracing::debug!(attempt = attempt + 1, error = %e, "retryable failure");
                    last_err = Some(e);
                }
                Err(e) => return Attempt::Failed(e),
            }
        }

        Attempt::Exhausted(
            last_err.unwrap_or_else(|| io::Error::other("retry loop ran zero attempts")),
        )
    }
}

pub fn is_retryable(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}
