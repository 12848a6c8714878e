//! Flaky peer simulation for `--flaky-peer`.
//!
//! Cycles the loopback channel through a fixed pattern, one step per relay
//! interval: a few reachable intervals with an occasional injected send
//! failure, then a short out-of-range stretch kept below the breaker
//! threshold so the relay recovers and flushes its queue.

use famefit_relay::loopback::LoopbackChannel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerStep {
    Reachable,
    /// Reachable, but the next send fails
    Glitch,
    OutOfRange,
}

const PATTERN: [PeerStep; 8] = [
    PeerStep::Reachable,
    PeerStep::Glitch,
    PeerStep::Reachable,
    PeerStep::OutOfRange,
    PeerStep::OutOfRange,
    PeerStep::OutOfRange,
    PeerStep::Reachable,
    PeerStep::Glitch,
];

fn apply(channel: &LoopbackChannel, step: PeerStep) {
    match step {
        PeerStep::Reachable => channel.set_reachable(true),
        PeerStep::Glitch => {
            channel.set_reachable(true);
            channel.fail_next(1);
        }
        PeerStep::OutOfRange => channel.set_reachable(false),
    }
}

/// Drive `channel` through the flaky pattern until shutdown.
pub async fn drive_flaky_peer(
    channel: Arc<LoopbackChannel>,
    step_every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("flaky peer enabled: pattern step every {}s", step_every.as_secs());
    let mut ticker = tokio::time::interval(step_every);
    let mut steps = PATTERN.iter().copied().cycle();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(step) = steps.next() {
                    debug!("flaky peer step: {step:?}");
                    apply(&channel, step);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    channel.set_reachable(true);
}
