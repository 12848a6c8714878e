//! Clock/scheduler port.
//!
//! Lets the relay timestamp snapshots and wait out retry backoff without
//! binding tests to wall-clock time.
//!
//! Implementations: `famefit-relay` crate (`TokioClock`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source for the relay
#[async_trait]
pub trait RelayClock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}
