//! Phone-side metrics receiver.
//!
//! Keeps the newest snapshot per group workout. Delivery order is not
//! guaranteed (queued snapshots are flushed concurrently and may land after
//! a fresher live send), so arrivals older than the stored snapshot are
//! dropped as stale.

use famefit_core::error::CoreError;
use famefit_core::models::metrics::MetricsSnapshot;
use famefit_core::ports::device_channel::ChannelPayload;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::loopback::LoopbackPeer;
use crate::payload::decode_snapshot;

const STATUS_KEY: &str = "status";

/// Receiver counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    /// Snapshots stored as the newest for their workout
    pub accepted: u64,
    /// Snapshots older than the stored one
    pub stale: u64,
    /// Payloads that failed to decode
    pub rejected: u64,
}

/// Result of handling one arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Accepted,
    Stale,
}

#[derive(Default)]
struct ReceiverState {
    latest: HashMap<String, MetricsSnapshot>,
    stats: ReceiverStats,
}

/// Latest-snapshot store for incoming metrics messages
#[derive(Default)]
pub struct MetricsReceiver {
    state: RwLock<ReceiverState>,
}

impl MetricsReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and store a metrics message.
    pub fn handle_message(&self, payload: &ChannelPayload) -> Result<Arrival, CoreError> {
        let snapshot = match decode_snapshot(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.state.write().stats.rejected += 1;
                return Err(e);
            }
        };

        let mut state = self.state.write();
        let is_newer = state
            .latest
            .get(&snapshot.workout_id)
            .map_or(true, |current| snapshot.timestamp > current.timestamp);

        if is_newer {
            state.stats.accepted += 1;
            state.latest.insert(snapshot.workout_id.clone(), snapshot);
            Ok(Arrival::Accepted)
        } else {
            state.stats.stale += 1;
            debug!(
                "stale metrics for {} ({}) dropped",
                snapshot.workout_id, snapshot.timestamp
            );
            Ok(Arrival::Stale)
        }
    }

    /// Newest snapshot received for `workout_id`
    pub fn latest(&self, workout_id: &str) -> Option<MetricsSnapshot> {
        self.state.read().latest.get(workout_id).cloned()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.state.read().stats
    }

    /// Answer requests from `peer` until shutdown or until the channel side
    /// is dropped.
    pub async fn serve(self: Arc<Self>, mut peer: LoopbackPeer, mut shutdown: watch::Receiver<bool>) {
        info!("metrics receiver listening");
        loop {
            tokio::select! {
                request = peer.recv() => {
                    let Some(request) = request else {
                        debug!("loopback channel closed");
                        break;
                    };
                    let reply = match self.handle_message(&request.payload) {
                        Ok(arrival) => Ok(status_reply(arrival)),
                        Err(e) => {
                            warn!("metrics message rejected: {e}");
                            Err(e.to_string())
                        }
                    };
                    request.respond(reply);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("metrics receiver stopped");
    }
}

fn status_reply(arrival: Arrival) -> ChannelPayload {
    let status = match arrival {
        Arrival::Accepted => "ok",
        Arrival::Stale => "stale",
    };
    let mut reply = ChannelPayload::new();
    reply.insert(STATUS_KEY.into(), Value::from(status));
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::loopback_pair;
    use crate::payload::encode_snapshot;
    use chrono::{Duration, Utc};
    use famefit_core::models::metrics::TelemetryReading;
    use famefit_core::ports::device_channel::DeviceChannel;

    fn snapshot(workout_id: &str, offset_secs: i64, heart_rate: f64) -> MetricsSnapshot {
        let reading = TelemetryReading {
            heart_rate,
            ..TelemetryReading::default()
        };
        MetricsSnapshot::capture(
            workout_id,
            Utc::now() + Duration::seconds(offset_secs),
            &reading,
        )
    }

    #[test]
    fn keeps_newest_snapshot_per_workout() {
        let receiver = MetricsReceiver::new();
        let newer = snapshot("gw_a", 30, 140.0);
        let older = snapshot("gw_a", 0, 120.0);

        assert_eq!(
            receiver.handle_message(&encode_snapshot(&newer)).unwrap(),
            Arrival::Accepted
        );
        assert_eq!(
            receiver.handle_message(&encode_snapshot(&older)).unwrap(),
            Arrival::Stale
        );

        assert_eq!(receiver.latest("gw_a").unwrap().heart_rate, 140.0);
        assert_eq!(
            receiver.stats(),
            ReceiverStats {
                accepted: 1,
                stale: 1,
                rejected: 0
            }
        );
    }

    #[test]
    fn workouts_are_tracked_separately() {
        let receiver = MetricsReceiver::new();
        receiver
            .handle_message(&encode_snapshot(&snapshot("gw_a", 10, 130.0)))
            .unwrap();
        receiver
            .handle_message(&encode_snapshot(&snapshot("gw_b", 0, 110.0)))
            .unwrap();

        assert_eq!(receiver.latest("gw_b").unwrap().heart_rate, 110.0);
        assert!(receiver.latest("gw_c").is_none());
    }

    #[test]
    fn malformed_payload_is_counted() {
        let receiver = MetricsReceiver::new();
        let mut payload = encode_snapshot(&snapshot("gw_a", 0, 100.0));
        payload.remove("heartRate");

        assert!(receiver.handle_message(&payload).is_err());
        assert_eq!(receiver.stats().rejected, 1);
        assert!(receiver.latest("gw_a").is_none());
    }

    #[tokio::test]
    async fn serve_replies_over_loopback() {
        let (channel, peer) = loopback_pair(8);
        let receiver = Arc::new(MetricsReceiver::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&receiver).serve(peer, shutdown_rx));

        let reply = channel
            .send_message(encode_snapshot(&snapshot("gw_a", 0, 150.0)))
            .await
            .unwrap();
        assert_eq!(reply["status"], "ok");

        let mut bad = ChannelPayload::new();
        bad.insert("command".into(), Value::from("unknown"));
        assert!(channel.send_message(bad).await.is_err());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(receiver.stats().accepted, 1);
        assert_eq!(receiver.stats().rejected, 1);
    }
}
