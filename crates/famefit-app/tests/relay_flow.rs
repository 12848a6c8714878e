//! Relay end-to-end flows.
//!
//! Relay → loopback channel → receiver, on paused tokio time.

use famefit_core::config::RelayConfig;
use famefit_core::models::workout::GroupWorkout;
use famefit_core::ports::telemetry::TelemetrySource;
use famefit_relay::clock::TokioClock;
use famefit_relay::events::{RelayEvent, RelayPhase};
use famefit_relay::loopback::{loopback_pair, LoopbackChannel};
use famefit_relay::receiver::MetricsReceiver;
use famefit_relay::relay::MetricsRelay;
use famefit_telemetry::live::LiveTelemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const INTERVAL: Duration = Duration::from_secs(30);

struct Harness {
    relay: Arc<MetricsRelay>,
    channel: Arc<LoopbackChannel>,
    receiver: Arc<MetricsReceiver>,
    telemetry: LiveTelemetry,
    workout_id: String,
    _shutdown_tx: watch::Sender<bool>,
}

fn harness() -> Harness {
    let telemetry = LiveTelemetry::new();
    let (channel, peer) = loopback_pair(32);
    let channel = Arc::new(channel);
    let receiver = Arc::new(MetricsReceiver::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(Arc::clone(&receiver).serve(peer, shutdown_rx));

    let relay = Arc::new(MetricsRelay::new(
        RelayConfig::default(),
        Arc::new(telemetry.clone()),
        channel.clone(),
        Arc::new(TokioClock),
    ));
    let workout = GroupWorkout::new("Saturday long run");
    let workout_id = workout.workout_id.clone();
    relay.attach_group_workout(workout);

    Harness {
        relay,
        channel,
        receiver,
        telemetry,
        workout_id,
        _shutdown_tx: shutdown_tx,
    }
}

/// Sleep through `ticks` relay intervals (plus a margin for the last tick)
async fn run_ticks(ticks: u32) {
    tokio::time::sleep(INTERVAL * ticks + Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn healthy_peer_receives_every_tick() {
    let h = harness();
    h.telemetry.set_running(true);
    h.telemetry.record_heart_rate(142.0);
    h.telemetry.add_energy(55.5);
    h.telemetry.add_distance(980.0);
    h.telemetry.set_elapsed(420.0);

    assert!(h.relay.start_relay());
    run_ticks(3).await;

    assert_eq!(h.channel.sent_count(), 3);
    assert_eq!(h.receiver.stats().accepted, 3);
    let latest = h.receiver.latest(&h.workout_id).unwrap();
    assert_eq!(latest.reading(), h.telemetry.current());

    let stats = h.relay.stats();
    assert_eq!(stats.phase, RelayPhase::Active);
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn twelve_unreachable_ticks_trip_after_fifth() {
    let h = harness();
    h.channel.set_reachable(false);
    let mut events = h.relay.subscribe();

    h.relay.start_relay();
    run_ticks(12).await;

    let stats = h.relay.stats();
    assert_eq!(stats.phase, RelayPhase::Tripped);
    assert_eq!(stats.unreachable_count, 5);
    assert_eq!(stats.queued, 4);
    assert_eq!(stats.pending, 4);
    assert_eq!(h.channel.sent_count(), 0);

    let mut queued = 0;
    let mut tripped = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            RelayEvent::Queued { .. } => queued += 1,
            RelayEvent::Tripped { .. } => tripped += 1,
            _ => {}
        }
    }
    assert_eq!((queued, tripped), (4, 1));
}

#[tokio::test(start_paused = true)]
async fn new_session_rearms_and_flushes_backlog() {
    let h = harness();
    h.channel.set_reachable(false);
    h.relay.start_relay();
    run_ticks(5).await;
    assert_eq!(h.relay.phase(), RelayPhase::Tripped);

    // peer back in range; nothing happens until the next session starts
    h.channel.set_reachable(true);
    run_ticks(2).await;
    assert_eq!(h.channel.sent_count(), 0);

    assert!(h.relay.start_relay());
    assert_eq!(h.relay.unreachable_count(), 0);
    run_ticks(1).await;

    // four queued snapshots flushed, then the fresh one
    assert_eq!(h.channel.sent_count(), 5);
    assert_eq!(h.relay.pending_len(), 0);
    let received = h.receiver.stats();
    assert_eq!(received.accepted + received.stale, 5);
}

#[tokio::test(start_paused = true)]
async fn short_outage_recovers_without_tripping() {
    let h = harness();
    h.relay.start_relay();

    h.channel.set_reachable(false);
    run_ticks(4).await;
    assert_eq!(h.relay.unreachable_count(), 4);
    assert_eq!(h.relay.pending_len(), 4);

    h.channel.set_reachable(true);
    run_ticks(1).await;

    assert_eq!(h.relay.phase(), RelayPhase::Active);
    assert_eq!(h.relay.unreachable_count(), 0);
    assert_eq!(h.relay.pending_len(), 0);
    assert_eq!(h.channel.sent_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_backoff() {
    let h = harness();
    h.channel.fail_next(2);
    let mut events = h.relay.subscribe();
    h.relay.start_relay();

    // tick at 30s, retries after 2s and 4s
    tokio::time::sleep(INTERVAL + Duration::from_secs(5)).await;
    assert_eq!(h.channel.sent_count(), 0);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.channel.sent_count(), 1);

    let delays: Vec<Duration> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            RelayEvent::RetryScheduled { delay, .. } => Some(delay),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![Duration::from_secs(2), Duration::from_secs(4)]);

    let stats = h.relay.stats();
    assert_eq!(stats.retry_count, 0);
    assert_eq!(stats.send_failures, 2);
    assert_eq!(stats.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_queues_then_next_tick_flushes() {
    let h = harness();
    h.channel.fail_next(3);
    h.relay.start_relay();

    // 30s tick + 2s + 4s backoff, then diverted to the queue
    tokio::time::sleep(INTERVAL + Duration::from_secs(7)).await;
    assert_eq!(h.relay.pending_len(), 1);
    assert_eq!(h.relay.retry_count(), 0);
    assert_eq!(h.receiver.stats().accepted, 0);

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(h.relay.pending_len(), 0);
    assert_eq!(h.channel.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stopped_relay_stays_stopped() {
    let h = harness();
    h.relay.start_relay();
    run_ticks(1).await;
    assert_eq!(h.channel.sent_count(), 1);

    h.relay.stop_relay();
    h.relay.stop_relay();
    run_ticks(4).await;

    assert_eq!(h.relay.phase(), RelayPhase::Idle);
    assert_eq!(h.channel.sent_count(), 1);
}
