//! Relay events and statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Relay lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelayPhase {
    /// No timer (never started, or stopped by the session)
    Idle,
    /// Timer running, sends attempted
    Active,
    /// Breaker tripped; timer stopped until the next session start
    Tripped,
}

impl std::fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayPhase::Idle => write!(f, "Idle"),
            RelayPhase::Active => write!(f, "Active"),
            RelayPhase::Tripped => write!(f, "Tripped"),
        }
    }
}

/// Relay transition, broadcast to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Timer started for a group workout
    Started { workout_id: String },
    /// Snapshot reached the paired device
    Delivered { timestamp: DateTime<Utc> },
    /// Send failed; the same snapshot is re-dispatched after `delay`
    RetryScheduled { attempt: u32, delay: Duration },
    /// Snapshot buffered in the pending queue
    Queued {
        timestamp: DateTime<Utc>,
        pending: usize,
        evicted: bool,
    },
    /// Pending queue flush finished
    Flushed { delivered: usize, requeued: usize },
    /// Breaker tripped; relay stopped
    Tripped { unreachable_count: u32 },
    /// Timer stopped by the session
    Stopped,
}

/// Point-in-time relay statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayStats {
    pub phase: RelayPhase,
    /// Current consecutive send-failure count
    pub retry_count: u32,
    /// Current consecutive unreachable-tick count
    pub unreachable_count: u32,
    /// Snapshots waiting in the pending queue
    pub pending: usize,
    /// Snapshots delivered (live and flushed)
    pub delivered: u64,
    /// Snapshots pushed into the pending queue (including requeues)
    pub queued: u64,
    /// Queue entries evicted by newer snapshots
    pub evicted: u64,
    /// Snapshots not relayed because the breaker tripped on their tick
    pub discarded: u64,
    /// Failed send attempts (live and flushed)
    pub send_failures: u64,
}

/// Running totals kept by the relay
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RelayTotals {
    pub delivered: u64,
    pub queued: u64,
    pub evicted: u64,
    pub discarded: u64,
    pub send_failures: u64,
}
