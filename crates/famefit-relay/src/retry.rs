//! Send retry state.
//!
//! One counter per relay, shared by every snapshot: it resets on any
//! successful send and, once it reaches the ceiling, the failing snapshot
//! is diverted to the pending queue instead of being retried again.

use std::time::Duration;

/// What to do after a failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-dispatch the same snapshot after the delay
    RetryAfter(Duration),
    /// Stop retrying and queue the snapshot
    Divert,
}

/// Consecutive-failure counter with linear backoff
#[derive(Debug, Clone)]
pub struct RetryState {
    retry_count: u32,
    max_retries: u32,
    backoff_step: Duration,
}

impl RetryState {
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            retry_count: 0,
            max_retries: max_retries.max(1),
            backoff_step,
        }
    }

    /// Record a failed send.
    ///
    /// Failure `n` (1-based) below the ceiling waits `n * step`; reaching
    /// the ceiling resets the counter and diverts.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.retry_count += 1;
        if self.retry_count < self.max_retries {
            RetryDecision::RetryAfter(self.backoff_step * self.retry_count)
        } else {
            self.retry_count = 0;
            RetryDecision::Divert
        }
    }

    pub fn record_success(&mut self) {
        self.retry_count = 0;
    }

    pub fn reset(&mut self) {
        self.retry_count = 0;
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
