//! Relay event logging.
//!
//! Subscribes to the relay's broadcast channel and mirrors each event to the
//! log, keeping a tally for the end-of-run summary.

use famefit_relay::events::RelayEvent;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Event counts observed by the logger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventTally {
    pub delivered: u64,
    pub retries: u64,
    pub queued: u64,
    pub flushes: u64,
    pub trips: u64,
    /// Events skipped because the logger fell behind
    pub lagged: u64,
}

impl EventTally {
    fn record(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::Delivered { .. } => self.delivered += 1,
            RelayEvent::RetryScheduled { .. } => self.retries += 1,
            RelayEvent::Queued { .. } => self.queued += 1,
            RelayEvent::Flushed { .. } => self.flushes += 1,
            RelayEvent::Tripped { .. } => self.trips += 1,
            RelayEvent::Started { .. } | RelayEvent::Stopped => {}
        }
    }
}

fn log_event(event: &RelayEvent) {
    match event {
        RelayEvent::Started { workout_id } => info!("relay started for {workout_id}"),
        RelayEvent::Delivered { timestamp } => debug!("delivered snapshot {timestamp}"),
        RelayEvent::RetryScheduled { attempt, delay } => {
            debug!("retry {attempt} scheduled in {}s", delay.as_secs())
        }
        RelayEvent::Queued {
            pending, evicted, ..
        } => {
            if *evicted {
                warn!("pending queue full, oldest snapshot evicted ({pending} pending)");
            } else {
                debug!("snapshot queued ({pending} pending)");
            }
        }
        RelayEvent::Flushed {
            delivered,
            requeued,
        } => info!("pending flush: {delivered} delivered, {requeued} requeued"),
        RelayEvent::Tripped { unreachable_count } => {
            warn!("relay tripped after {unreachable_count} unreachable ticks")
        }
        RelayEvent::Stopped => info!("relay stopped"),
    }
}

/// Log relay events until shutdown or until the relay is dropped.
pub async fn log_relay_events(
    mut events: broadcast::Receiver<RelayEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> EventTally {
    let mut tally = EventTally::default();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    log_event(&event);
                    tally.record(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event logger lagged, {skipped} events skipped");
                    tally.lagged += skipped;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    // events emitted during shutdown
    while let Ok(event) = events.try_recv() {
        log_event(&event);
        tally.record(&event);
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn tallies_events_until_closed() {
        let (tx, rx) = broadcast::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(RelayEvent::Started {
            workout_id: "gw_test".to_string(),
        })
        .unwrap();
        tx.send(RelayEvent::Delivered {
            timestamp: Utc::now(),
        })
        .unwrap();
        tx.send(RelayEvent::RetryScheduled {
            attempt: 1,
            delay: Duration::from_secs(2),
        })
        .unwrap();
        tx.send(RelayEvent::Tripped {
            unreachable_count: 5,
        })
        .unwrap();
        drop(tx);

        let tally = log_relay_events(rx, shutdown_rx).await;
        assert_eq!(tally.delivered, 1);
        assert_eq!(tally.retries, 1);
        assert_eq!(tally.trips, 1);
        assert_eq!(tally.lagged, 0);
    }

    #[tokio::test]
    async fn counts_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        for _ in 0..5 {
            tx.send(RelayEvent::Stopped).unwrap();
        }
        drop(tx);

        let tally = log_relay_events(rx, shutdown_rx).await;
        assert_eq!(tally.lagged, 3);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(log_relay_events(rx, shutdown_rx));

        shutdown_tx.send(true).unwrap();
        let tally = task.await.unwrap();
        assert_eq!(tally, EventTally::default());
        drop(tx);
    }
}
