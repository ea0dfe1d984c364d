use super::RetryPolicy;
use crate::error::{HttpError, HttpResult};
use std::future::Future;

/// Runs a fallible request under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// policy's attempts are used up
    ///
    /// `op` receives the 1-based attempt number. Non-retryable errors are
    /// returned as-is; exhaustion wraps the last error in
    /// [`HttpError::RetryExhausted`].
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> HttpResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = HttpResult<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !self.policy.is_retryable(&err) {
                return Err(err);
            }

            if attempt >= self.policy.max_attempts {
                tracing::warn!(attempts = attempt, error = %err, "Retry attempts exhausted");
                return Err(HttpError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.policy.delay_for_error(attempt, &err);
            if err.is_rate_limited() {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
            } else {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Request failed, retrying"
                );
            }
            tokio::time::sleep(delay).await;
        }
    }
}
