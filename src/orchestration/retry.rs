//! Whole-job retry with a fixed count and a fixed delay.

use crate::orchestration::{JobError, JobKind};
use backoff::backoff::Backoff;
use backoff::future::retry;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn backoff(&self) -> FixedRetries {
        FixedRetries {
            policy: *self,
            retries: 0,
        }
    }
}

/// [`Backoff`] yielding `delay` exactly `max_retries` times.
#[derive(Debug, Clone)]
pub struct FixedRetries {
    policy: RetryPolicy,
    retries: u32,
}

impl Backoff for FixedRetries {
    fn reset(&mut self) {
        self.retries = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries >= self.policy.max_retries {
            return None;
        }
        self.retries += 1;
        Some(self.policy.delay)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Every error is treated as transient; the last one is returned.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    job: JobKind,
    mut op: F,
) -> Result<T, JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JobError>>,
{
    let mut attempt = 0u32;
    retry(policy.backoff(), || {
        attempt += 1;
        let current = attempt;
        let fut = op();
        async move {
            fut.await.map_err(|e| {
                warn!(job = %job, attempt = current, error = %e, "job attempt failed");
                backoff::Error::transient(e)
            })
        }
    })
    .await
}
