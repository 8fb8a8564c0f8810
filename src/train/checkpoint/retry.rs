//! Bounded retries with exponential backoff for checkpoint I/O

use crate::error::Result;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: usize,
    backoff: Duration,
}

impl RetryPolicy {
    /// `attempts` total tries (at least one); the wait starts at `backoff`
    /// and doubles after every failure
    pub fn new(attempts: usize, backoff: Duration) -> Self {
        Self { attempts: attempts.max(1), backoff }
    }

    pub fn from_spec(spec: &crate::config::TrainSpec) -> Self {
        Self::new(spec.checkpoint_retries, Duration::from_millis(spec.checkpoint_backoff_ms))
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Run `op` until it succeeds or the attempts are used up; the last
    /// error is returned
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut wait = self.backoff;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    tracing::warn!(
                        operation = what,
                        attempt,
                        attempts = self.attempts,
                        error = %e,
                        "checkpoint operation failed, retrying"
                    );
                    thread::sleep(wait);
                    wait = wait.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
