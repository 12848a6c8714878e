//! Tokio-backed relay clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use famefit_core::ports::clock::RelayClock;
use std::time::Duration;

/// `RelayClock` implementation using `Utc::now` and `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl RelayClock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
