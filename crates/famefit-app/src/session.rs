//! Workout session lifecycle and group-workout coordination.
//!
//! The session state machine drives the relay: starting a group workout
//! attaches its context and starts the relay, ending it stops the relay,
//! and a reset clears the pending queue. Pausing only flips the telemetry
//! `is_running` flag; the relay keeps publishing.

use famefit_core::error::CoreError;
use famefit_core::models::workout::{GroupWorkout, SessionState};
use famefit_relay::relay::MetricsRelay;
use famefit_telemetry::live::LiveTelemetry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Workout session state machine
#[derive(Debug, Clone)]
pub struct WorkoutSession {
    state: SessionState,
}

impl WorkoutSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::NotStarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: SessionState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("session {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

impl Default for WorkoutSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Couples the workout session to the metrics relay
pub struct GroupWorkoutCoordinator {
    relay: Arc<MetricsRelay>,
    telemetry: LiveTelemetry,
    session: Mutex<WorkoutSession>,
}

impl GroupWorkoutCoordinator {
    pub fn new(relay: Arc<MetricsRelay>, telemetry: LiveTelemetry) -> Self {
        Self {
            relay,
            telemetry,
            session: Mutex::new(WorkoutSession::new()),
        }
    }

    /// Start recording for `workout`. Returns whether the relay started.
    pub fn start(&self, workout: GroupWorkout) -> Result<bool, CoreError> {
        self.session.lock().transition(SessionState::Running)?;
        info!("group workout started: {} ({})", workout.name, workout.workout_id);

        self.telemetry.set_running(true);
        self.relay.attach_group_workout(workout);
        Ok(self.relay.start_relay())
    }

    pub fn pause(&self) -> Result<(), CoreError> {
        self.session.lock().transition(SessionState::Paused)?;
        self.telemetry.set_running(false);
        info!("workout paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), CoreError> {
        self.session.lock().transition(SessionState::Running)?;
        self.telemetry.set_running(true);
        info!("workout resumed");
        Ok(())
    }

    /// End the workout and stop the relay. Queued snapshots stay queued.
    pub fn end(&self) -> Result<(), CoreError> {
        self.session.lock().transition(SessionState::Ended)?;
        self.telemetry.set_running(false);
        self.relay.stop_relay();
        info!("workout ended");
        Ok(())
    }

    /// Discard the session: stop the relay, clear its queue and counters,
    /// zero the telemetry and return to `NotStarted`.
    pub fn reset(&self) {
        self.relay.reset();
        self.relay.detach_group_workout();
        self.telemetry.reset();
        *self.session.lock() = WorkoutSession::new();
        info!("workout session reset");
    }

    /// Pause `after` from now and resume `length` later. Skipped steps
    /// (workout already ended) are logged, not errors.
    pub async fn pause_window(&self, after: Duration, length: Duration) {
        tokio::time::sleep(after).await;
        if let Err(e) = self.pause() {
            debug!("scheduled pause skipped: {e}");
            return;
        }
        tokio::time::sleep(length).await;
        if let Err(e) = self.resume() {
            debug!("scheduled resume skipped: {e}");
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    pub fn relay(&self) -> &Arc<MetricsRelay> {
        &self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famefit_core::config::RelayConfig;
    use famefit_core::ports::telemetry::TelemetrySource;
    use famefit_relay::clock::TokioClock;
    use famefit_relay::events::RelayPhase;
    use famefit_relay::loopback::{loopback_pair, LoopbackChannel, LoopbackPeer};

    fn coordinator() -> (GroupWorkoutCoordinator, Arc<LoopbackChannel>, LoopbackPeer) {
        let telemetry = LiveTelemetry::new();
        let (channel, peer) = loopback_pair(16);
        let channel = Arc::new(channel);
        let relay = Arc::new(MetricsRelay::new(
            RelayConfig::default(),
            Arc::new(telemetry.clone()),
            channel.clone(),
            Arc::new(TokioClock),
        ));
        (GroupWorkoutCoordinator::new(relay, telemetry), channel, peer)
    }

    #[test]
    fn session_rejects_illegal_transitions() {
        let mut session = WorkoutSession::new();
        let err = session.transition(SessionState::Paused).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        session.transition(SessionState::Running).unwrap();
        session.transition(SessionState::Ended).unwrap();
        assert!(session.transition(SessionState::Running).is_err());
        assert_eq!(session.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn start_attaches_workout_and_starts_relay() {
        let (coordinator, _channel, _peer) = coordinator();

        assert!(coordinator.start(GroupWorkout::new("Hill repeats")).unwrap());
        assert_eq!(coordinator.state(), SessionState::Running);
        assert_eq!(coordinator.relay().phase(), RelayPhase::Active);
        assert!(coordinator.telemetry.current().is_running);
    }

    #[tokio::test]
    async fn pause_keeps_relay_running() {
        let (coordinator, _channel, _peer) = coordinator();
        coordinator.start(GroupWorkout::new("Spin")).unwrap();

        coordinator.pause().unwrap();
        assert_eq!(coordinator.relay().phase(), RelayPhase::Active);
        assert!(!coordinator.telemetry.current().is_running);

        coordinator.resume().unwrap();
        assert!(coordinator.telemetry.current().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_window_pauses_then_resumes() {
        let (coordinator, _channel, _peer) = coordinator();
        let coordinator = Arc::new(coordinator);
        coordinator.start(GroupWorkout::new("Fartlek")).unwrap();

        let window = Arc::clone(&coordinator);
        let task = tokio::spawn(async move {
            window
                .pause_window(Duration::from_secs(60), Duration::from_secs(30))
                .await
        });

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(coordinator.state(), SessionState::Paused);
        assert!(!coordinator.telemetry.current().is_running);

        task.await.unwrap();
        assert_eq!(coordinator.state(), SessionState::Running);
        assert!(coordinator.telemetry.current().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_window_after_end_is_skipped() {
        let (coordinator, _channel, _peer) = coordinator();
        coordinator.start(GroupWorkout::new("Tempo")).unwrap();
        coordinator.end().unwrap();

        coordinator
            .pause_window(Duration::from_secs(5), Duration::from_secs(5))
            .await;
        assert_eq!(coordinator.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn end_stops_relay_and_reset_clears_queue() {
        let (coordinator, channel, _peer) = coordinator();
        coordinator.start(GroupWorkout::new("Row")).unwrap();

        channel.set_reachable(false);
        coordinator.relay().on_timer_tick().await;
        assert_eq!(coordinator.relay().pending_len(), 1);

        coordinator.end().unwrap();
        assert_eq!(coordinator.relay().phase(), RelayPhase::Idle);
        assert_eq!(coordinator.relay().pending_len(), 1);
        assert!(coordinator.pause().is_err());

        coordinator.reset();
        assert_eq!(coordinator.state(), SessionState::NotStarted);
        assert_eq!(coordinator.relay().pending_len(), 0);
        // the old group workout is gone; a new start needs a new context
        assert!(!coordinator.relay().start_relay());
    }
}
