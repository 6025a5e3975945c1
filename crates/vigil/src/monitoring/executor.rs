use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use super::policy::Policy;
use super::types::Attempt;
use crate::probe::Probe;

/// Drives a probe through the attempts and retries of one check
#[derive(Debug, Clone, Copy)]
pub struct AttemptExecutor {
    attempts: u32,
    retries: u32,
    attempt_spacing: Duration,
    retry_spacing: Duration,
}

impl AttemptExecutor {
    /// Create an executor from a policy, normalizing zero attempts to one
    pub fn new(policy: &Policy) -> Self {
        Self {
            attempts: policy.attempts.max(1),
            retries: policy.retries,
            attempt_spacing: policy.attempt_spacing,
            retry_spacing: policy.retry_spacing,
        }
    }

    /// Run every top-level attempt in order and return one record per attempt.
    ///
    /// Attempts run one at a time; spacing and retry delays are awaited in
    /// sequence, so the returned order is the execution order.
    pub async fn run<P: Probe + ?Sized>(&self, title: &str, probe: &P) -> Vec<Attempt> {
        let mut records = Vec::with_capacity(self.attempts as usize);

        for index in 0..self.attempts {
            let start = Instant::now();

            let record = match probe.attempt().await {
                Ok(()) => Attempt::success(start.elapsed()),
                Err(e) => {
                    let reason = format!("{e:#}");
                    debug!(target_title = title, attempt = index, %reason, "attempt failed");

                    if self.retries > 0 {
                        match self.retry(title, index, probe).await {
                            Ok(()) => Attempt::success(start.elapsed()),
                            Err(last) => Attempt { latency: start.elapsed(), error: Some(last) },
                        }
                    } else {
                        Attempt { latency: start.elapsed(), error: Some(reason) }
                    }
                }
            };
            records.push(record);

            if !self.attempt_spacing.is_zero() && index + 1 < self.attempts {
                sleep(self.attempt_spacing).await;
            }
        }

        records
    }

    /// Retry until the first success or until the budget is spent, returning
    /// the last failure reason in the latter case.
    async fn retry<P: Probe + ?Sized>(&self, title: &str, index: u32, probe: &P) -> Result<(), String> {
        let mut last = String::new();

        for retry in 1..=self.retries {
            if !self.retry_spacing.is_zero() {
                sleep(self.retry_spacing).await;
            }

            match probe.attempt().await {
                Ok(()) => {
                    debug!(target_title = title, attempt = index, retry, "retry succeeded");
                    return Ok(());
                }
                Err(e) => {
                    last = format!("{e:#}");
                    debug!(target_title = title, attempt = index, retry, reason = %last, "retry failed");
                }
            }
        }

        Err(last)
    }
}
