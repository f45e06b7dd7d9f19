use crate::infrastructure::error::InfraError;
use std::future::Future;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::debug;

/// Backoff for idempotent reads. Writes are never routed through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, InfraError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InfraError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay,
                        %error,
                        "retrying read"
                    );
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Only transport failures are retried automatically; a remote rejection
/// would come back the same.
fn should_retry(error: &InfraError) -> bool {
    matches!(error, InfraError::Network(_))
}
