//! Timeout and bounded retry around upstream calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::{UpstreamError, UpstreamResult};

/// Per-attempt timeout plus a bounded number of retries with linear backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Deadline for each attempt
    pub timeout: Duration,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base delay, multiplied by the retry number
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self {
            timeout,
            backoff,
            ..Default::default()
        }
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> UpstreamResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        let mut attempt = 0;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(UpstreamError::Timeout {
                    timeout: self.timeout,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        error = %err,
                        "Upstream call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
