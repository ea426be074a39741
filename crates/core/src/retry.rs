//! Bounded retry with a fixed delay.
//!
//! Applied explicitly at the call sites that talk to unreliable
//! collaborators (the completion service, the transcript file).

use crate::error::RetryExhausted;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// Every failure is logged. The delay is only slept between attempts,
    /// never after the last one. A budget of zero behaves like one.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let budget = self.attempts.max(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    error!(operation, attempt, error = %e, "Operation failed");

                    if attempt >= budget {
                        error!(operation, attempts = attempt, "Max retries reached");
                        return Err(RetryExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }

                    warn!(operation, "Retrying... ({attempt}/{budget})");
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }
}
