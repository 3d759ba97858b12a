use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::CodeGraphError;

/// Exponential-backoff retry policy for heavy/light activities
/// (spec.md §5 "Retry": 3 attempts typical, 5 for the final review/post
/// step).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub const fn standard() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }

    pub const fn final_review() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let scale = self.multiplier.powi(attempt as i32 - 1);
        Duration::from_secs_f64(self.initial_backoff.as_secs_f64() * scale)
    }

    /// Run `op` up to `max_attempts` times, sleeping with exponential
    /// backoff between attempts. Only retries errors for which
    /// [`CodeGraphError::is_retryable`] is true; a non-retryable error
    /// (validation) returns immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, CodeGraphError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CodeGraphError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && err.is_retryable() => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        activity = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "activity failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
