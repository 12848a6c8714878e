//! Group-workout metrics relay.
//!
//! While a group workout is active, a timer task ticks every
//! `relay.interval_secs`. Each tick captures a [`MetricsSnapshot`] from the
//! telemetry source and dispatches it:
//!
//! 1. peer unreachable: count the miss; at the threshold the breaker trips
//!    and the timer stops, otherwise the snapshot is queued
//! 2. peer reachable: reset the miss count, flush the pending queue, send
//! 3. send ok: reset the retry counter
//! 4. send failed: re-dispatch after `n * step` seconds, or queue the
//!    snapshot once the retry ceiling is reached
//!
//! Nothing here fails the workout; every failure degrades to queuing.

use famefit_core::config::RelayConfig;
use famefit_core::models::metrics::MetricsSnapshot;
use famefit_core::models::workout::GroupWorkout;
use famefit_core::ports::clock::RelayClock;
use famefit_core::ports::device_channel::DeviceChannel;
use famefit_core::ports::telemetry::TelemetrySource;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::breaker::{BreakerState, ReachabilityBreaker};
use crate::events::{RelayEvent, RelayPhase, RelayStats, RelayTotals};
use crate::payload::encode_snapshot;
use crate::pending_queue::PendingQueue;
use crate::retry::{RetryDecision, RetryState};

/// Relay event broadcast buffer
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to the paired device
    Delivered,
    /// Buffered in the pending queue
    Queued,
    /// Breaker tripped on this tick; snapshot not relayed
    Tripped,
    /// Relay not running; nothing captured
    Inactive,
}

/// Running timer. Dropping it closes the stop channel, which ends the
/// timer task after its current tick.
struct TimerHandle {
    generation: u64,
    _stop_tx: watch::Sender<()>,
}

enum TimerSlot {
    Stopped,
    Running(TimerHandle),
}

struct RelayInner {
    timer: TimerSlot,
    generation: u64,
    group_workout: Option<GroupWorkout>,
    queue: PendingQueue<MetricsSnapshot>,
    retry: RetryState,
    breaker: ReachabilityBreaker,
    totals: RelayTotals,
}

impl RelayInner {
    fn phase(&self) -> RelayPhase {
        if self.breaker.is_tripped() {
            RelayPhase::Tripped
        } else if matches!(self.timer, TimerSlot::Running(_)) {
            RelayPhase::Active
        } else {
            RelayPhase::Idle
        }
    }

    fn is_active(&self) -> bool {
        self.phase() == RelayPhase::Active
    }

    fn is_current_timer(&self, generation: u64) -> bool {
        match &self.timer {
            TimerSlot::Running(handle) => {
                handle.generation == generation && !self.breaker.is_tripped()
            }
            TimerSlot::Stopped => false,
        }
    }

    /// Capacity-bounded insert; returns (queue length, evicted)
    fn enqueue(&mut self, snapshot: MetricsSnapshot) -> (usize, bool) {
        let evicted = self.queue.push(snapshot).is_some();
        self.totals.queued += 1;
        if evicted {
            self.totals.evicted += 1;
        }
        (self.queue.len(), evicted)
    }
}

/// Timer-driven relay of group-workout telemetry to the paired device
pub struct MetricsRelay {
    config: RelayConfig,
    telemetry: Arc<dyn TelemetrySource>,
    channel: Arc<dyn DeviceChannel>,
    clock: Arc<dyn RelayClock>,
    inner: Mutex<RelayInner>,
    event_tx: broadcast::Sender<RelayEvent>,
}

impl MetricsRelay {
    pub fn new(
        config: RelayConfig,
        telemetry: Arc<dyn TelemetrySource>,
        channel: Arc<dyn DeviceChannel>,
        clock: Arc<dyn RelayClock>,
    ) -> Self {
        let inner = RelayInner {
            timer: TimerSlot::Stopped,
            generation: 0,
            group_workout: None,
            queue: PendingQueue::new(config.pending_capacity),
            retry: RetryState::new(config.max_retries, config.retry_delay(1)),
            breaker: ReachabilityBreaker::new(config.unreachable_threshold),
            totals: RelayTotals::default(),
        };
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            telemetry,
            channel,
            clock,
            inner: Mutex::new(inner),
            event_tx,
        }
    }

    /// Set the group workout snapshots are published for
    pub fn attach_group_workout(&self, workout: GroupWorkout) {
        debug!("group workout attached: {}", workout.workout_id);
        self.inner.lock().group_workout = Some(workout);
    }

    /// Clear the group workout context; stops the relay.
    pub fn detach_group_workout(&self) -> Option<GroupWorkout> {
        self.stop_relay();
        self.inner.lock().group_workout.take()
    }

    /// Start the repeating relay timer.
    ///
    /// No-op (returns `false`) without an attached group workout. Starting
    /// re-arms a tripped breaker; starting an already running relay keeps
    /// the existing timer.
    pub fn start_relay(self: &Arc<Self>) -> bool {
        let (generation, stop_rx, workout_id) = {
            let mut inner = self.inner.lock();
            let Some(workout_id) = inner.group_workout.as_ref().map(|w| w.workout_id.clone())
            else {
                debug!("no group workout attached, relay not started");
                return false;
            };
            if inner.is_active() {
                return true;
            }

            inner.breaker.rearm();
            inner.retry.reset();
            inner.generation += 1;
            let generation = inner.generation;
            let (stop_tx, stop_rx) = watch::channel(());
            inner.timer = TimerSlot::Running(TimerHandle {
                generation,
                _stop_tx: stop_tx,
            });
            (generation, stop_rx, workout_id)
        };

        info!(
            "metrics relay started for {workout_id}: every {}s",
            self.config.interval_secs
        );
        self.emit(RelayEvent::Started { workout_id });

        let relay = Arc::clone(self);
        let period = self.config.interval();
        tokio::spawn(async move {
            relay.run_timer(generation, period, stop_rx).await;
        });
        true
    }

    /// Cancel the relay timer. Idempotent.
    pub fn stop_relay(&self) {
        let was_running = {
            let mut inner = self.inner.lock();
            matches!(
                std::mem::replace(&mut inner.timer, TimerSlot::Stopped),
                TimerSlot::Running(_)
            )
        };
        if was_running {
            info!("metrics relay stopped");
            self.emit(RelayEvent::Stopped);
        }
    }

    /// Stop the relay and clear the pending queue and counters (session reset)
    pub fn reset(&self) {
        self.stop_relay();
        let mut inner = self.inner.lock();
        inner.queue.clear();
        inner.retry.reset();
        inner.breaker.rearm();
        debug!("metrics relay reset");
    }

    async fn run_timer(
        self: Arc<Self>,
        generation: u64,
        period: Duration,
        mut stop_rx: watch::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = self.inner.lock().is_current_timer(generation);
                    if !current {
                        break;
                    }
                    self.on_timer_tick().await;
                }
                // only resolves once the handle (sender) is dropped
                _ = stop_rx.changed() => break,
            }
        }
        debug!("relay timer {generation} exited");
    }

    /// Capture a snapshot from the telemetry source and dispatch it.
    pub async fn on_timer_tick(&self) -> DispatchOutcome {
        let workout_id = {
            let inner = self.inner.lock();
            if !inner.is_active() {
                return DispatchOutcome::Inactive;
            }
            match &inner.group_workout {
                Some(workout) => workout.workout_id.clone(),
                None => return DispatchOutcome::Inactive,
            }
        };

        let reading = self.telemetry.current();
        let snapshot = MetricsSnapshot::capture(&workout_id, self.clock.now(), &reading);
        self.dispatch(snapshot).await
    }

    async fn dispatch(&self, snapshot: MetricsSnapshot) -> DispatchOutcome {
        // reachability feeds the breaker once per tick; retries never count
        if !self.channel.is_reachable() {
            return self.handle_unreachable(snapshot);
        }
        self.inner.lock().breaker.record_reachable();

        loop {
            self.flush_pending().await;

            let error = match self.channel.send_message(encode_snapshot(&snapshot)).await {
                Ok(_) => {
                    {
                        let mut inner = self.inner.lock();
                        inner.retry.record_success();
                        inner.totals.delivered += 1;
                    }
                    debug!("metrics delivered: {}", snapshot.timestamp);
                    self.emit(RelayEvent::Delivered {
                        timestamp: snapshot.timestamp,
                    });
                    return DispatchOutcome::Delivered;
                }
                Err(e) => e,
            };

            let (decision, attempt) = {
                let mut inner = self.inner.lock();
                inner.totals.send_failures += 1;
                let decision = inner.retry.record_failure();
                (decision, inner.retry.retry_count())
            };

            match decision {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        "metrics send failed (attempt {attempt}): {error}, retrying in {}s",
                        delay.as_secs()
                    );
                    self.emit(RelayEvent::RetryScheduled { attempt, delay });
                    self.clock.sleep(delay).await;

                    let still_active = self.inner.lock().is_active();
                    if !still_active {
                        return self.abandon_retry(snapshot, "relay stopped during retry backoff");
                    }
                    if !self.channel.is_reachable() {
                        return self.abandon_retry(snapshot, "paired device gone during retry backoff");
                    }
                }
                RetryDecision::Divert => {
                    warn!(
                        "metrics send failed {} times: {error}, queueing snapshot",
                        self.config.max_retries
                    );
                    return self.queue_snapshot(snapshot);
                }
            }
        }
    }

    /// Give up on a pending retry: the next failure burst starts from the
    /// first backoff step again.
    fn abandon_retry(&self, snapshot: MetricsSnapshot, reason: &str) -> DispatchOutcome {
        self.inner.lock().retry.reset();
        debug!("{reason}, queueing snapshot");
        self.queue_snapshot(snapshot)
    }

    fn handle_unreachable(&self, snapshot: MetricsSnapshot) -> DispatchOutcome {
        let tripped_at = {
            let mut inner = self.inner.lock();
            match inner.breaker.record_unreachable() {
                BreakerState::Tripped => {
                    inner.timer = TimerSlot::Stopped;
                    inner.totals.discarded += 1;
                    Some(inner.breaker.unreachable_count())
                }
                BreakerState::Active => None,
            }
        };

        match tripped_at {
            Some(unreachable_count) => {
                warn!(
                    "metrics relay stopped: paired device unreachable for {unreachable_count} ticks, {} snapshots kept locally",
                    self.pending_len()
                );
                self.emit(RelayEvent::Tripped { unreachable_count });
                DispatchOutcome::Tripped
            }
            None => self.queue_snapshot(snapshot),
        }
    }

    fn queue_snapshot(&self, snapshot: MetricsSnapshot) -> DispatchOutcome {
        let timestamp = snapshot.timestamp;
        let (pending, evicted) = self.inner.lock().enqueue(snapshot);
        debug!("metrics queued ({pending} pending, evicted={evicted})");
        self.emit(RelayEvent::Queued {
            timestamp,
            pending,
            evicted,
        });
        DispatchOutcome::Queued
    }

    /// Send every queued snapshot independently; failures are re-queued at
    /// the tail. Returns the number delivered.
    pub async fn flush_pending(&self) -> usize {
        if !self.channel.is_reachable() {
            return 0;
        }
        let drained = self.inner.lock().queue.drain_all();
        if drained.is_empty() {
            return 0;
        }
        let total = drained.len();

        let sends = drained.into_iter().map(|snapshot| async move {
            let result = self.channel.send_message(encode_snapshot(&snapshot)).await;
            (snapshot, result)
        });
        let results = join_all(sends).await;

        let mut delivered = 0;
        let mut requeued = 0;
        {
            let mut inner = self.inner.lock();
            for (snapshot, result) in results {
                match result {
                    Ok(_) => {
                        delivered += 1;
                        inner.totals.delivered += 1;
                    }
                    Err(e) => {
                        debug!("queued metrics send failed: {e}");
                        inner.totals.send_failures += 1;
                        inner.enqueue(snapshot);
                        requeued += 1;
                    }
                }
            }
        }

        info!("flushed pending metrics: {delivered}/{total} delivered");
        self.emit(RelayEvent::Flushed {
            delivered,
            requeued,
        });
        delivered
    }

    pub fn phase(&self) -> RelayPhase {
        self.inner.lock().phase()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Copy of the pending queue, oldest first
    pub fn pending_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.lock().queue.iter().cloned().collect()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.lock().retry.retry_count()
    }

    pub fn unreachable_count(&self) -> u32 {
        self.inner.lock().breaker.unreachable_count()
    }

    pub fn stats(&self) -> RelayStats {
        let inner = self.inner.lock();
        RelayStats {
            phase: inner.phase(),
            retry_count: inner.retry.retry_count(),
            unreachable_count: inner.breaker.unreachable_count(),
            pending: inner.queue.len(),
            delivered: inner.totals.delivered,
            queued: inner.totals.queued,
            evicted: inner.totals.evicted,
            discarded: inner.totals.discarded,
            send_failures: inner.totals.send_failures,
        }
    }

    /// Receiver for relay events
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: RelayEvent) {
        let _ = self.event_tx.send(event);
    }
}
