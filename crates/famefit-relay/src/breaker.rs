//! Reachability circuit breaker.
//!
//! Counts consecutive unreachable relay ticks. Once the count reaches the
//! threshold the breaker trips and stays tripped: there is no half-open
//! probe. Only [`ReachabilityBreaker::rearm`], called when a new session
//! starts the relay, returns it to `Active`.

use tracing::{debug, warn};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Relay may tick and send
    Active,
    /// Peer absent too long; relay timer must stay stopped
    Tripped,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Active => write!(f, "Active"),
            BreakerState::Tripped => write!(f, "Tripped"),
        }
    }
}

/// One-shot consecutive-unreachable breaker
#[derive(Debug, Clone)]
pub struct ReachabilityBreaker {
    state: BreakerState,
    unreachable_count: u32,
    threshold: u32,
}

impl ReachabilityBreaker {
    /// New breaker tripping after `threshold` consecutive unreachable ticks
    pub fn new(threshold: u32) -> Self {
        Self {
            state: BreakerState::Active,
            unreachable_count: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record an unreachable tick; returns the resulting state.
    pub fn record_unreachable(&mut self) -> BreakerState {
        if self.state == BreakerState::Tripped {
            return self.state;
        }

        self.unreachable_count += 1;
        debug!(
            "paired device unreachable ({}/{})",
            self.unreachable_count, self.threshold
        );

        if self.unreachable_count >= self.threshold {
            self.state = BreakerState::Tripped;
            warn!(
                "paired device unreachable for {} consecutive ticks, relay breaker tripped",
                self.unreachable_count
            );
        }
        self.state
    }

    /// Record a reachable tick
    pub fn record_reachable(&mut self) {
        if self.state == BreakerState::Active {
            self.unreachable_count = 0;
        }
    }

    /// Return to `Active` with a zeroed counter (new session)
    pub fn rearm(&mut self) {
        self.state = BreakerState::Active;
        self.unreachable_count = 0;
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn is_tripped(&self) -> bool {
        self.state == BreakerState::Tripped
    }

    pub fn unreachable_count(&self) -> u32 {
        self.unreachable_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
