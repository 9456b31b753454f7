//! Reconnection policy.
//!
//! Fixed delay between attempts, a bounded number of attempts, and a
//! timeout on every single attempt. Once the attempts are used up the
//! caller gets a terminal [`SyncError::ConnectionError`].

use std::future::Future;
use std::time::Duration;

use crate::shared::SyncError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the first attempt waits for the retry delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// First attempt right away (initial connect)
    Immediate,
    /// Delay before every attempt (recovering from a broken channel)
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl ReconnectPolicy {
    /// Run `attempt` until it succeeds or the policy is exhausted
    ///
    /// `attempt` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, schedule: Schedule, mut attempt: F) -> Result<T, SyncError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for n in 1..=max_attempts {
            if n > 1 || schedule == Schedule::Delayed {
                tokio::time::sleep(self.delay).await;
            }

            match tokio::time::timeout(self.attempt_timeout, attempt(n)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    tracing::warn!("[Session] Connect attempt {}/{} failed: {}", n, max_attempts, e);
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(
                        "[Session] Connect attempt {}/{} timed out after {:?}",
                        n,
                        max_attempts,
                        self.attempt_timeout
                    );
                    last_error = format!("attempt timed out after {:?}", self.attempt_timeout);
                }
            }
        }

        Err(SyncError::connection(max_attempts, last_error))
    }
}
