//! Simulated workout driver.
//!
//! Stands in for the health-data framework: advances a [`LiveTelemetry`]
//! store once per sample interval with a deterministic heart-rate ramp,
//! steady pace and constant burn rate. Paused sessions (`is_running ==
//! false`) accumulate nothing.

use famefit_core::config::SimulationConfig;
use famefit_core::ports::telemetry::TelemetrySource;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::live::LiveTelemetry;

/// Heart-rate ramp time constant (seconds)
const RAMP_TIME_CONSTANT_SECS: f64 = 90.0;

/// Amplitude of the periodic heart-rate wobble (bpm)
const WOBBLE_BPM: f64 = 4.0;

/// Synthetic workout feeding a live telemetry store
pub struct SimulatedWorkout {
    config: SimulationConfig,
    telemetry: LiveTelemetry,
    sample_interval: Duration,
    active_secs: f64,
}

impl SimulatedWorkout {
    pub fn new(config: SimulationConfig, telemetry: LiveTelemetry, sample_interval: Duration) -> Self {
        Self {
            config,
            telemetry,
            sample_interval,
            active_secs: 0.0,
        }
    }

    /// Heart rate after `active_secs` of exercise
    pub fn heart_rate_at(&self, active_secs: f64) -> f64 {
        let rest = self.config.resting_heart_rate;
        let target = self.config.target_heart_rate;
        let ramp = 1.0 - (-active_secs / RAMP_TIME_CONSTANT_SECS).exp();
        let wobble = WOBBLE_BPM * (active_secs / 20.0).sin() * ramp;
        rest + (target - rest) * ramp + wobble
    }

    /// Advance the simulation by `dt` of wall time.
    pub fn step(&mut self, dt: Duration) {
        if !self.telemetry.current().is_running {
            return;
        }
        let secs = dt.as_secs_f64();
        self.active_secs += secs;

        self.telemetry.record_heart_rate(self.heart_rate_at(self.active_secs));
        self.telemetry.add_energy(self.config.kcal_per_minute * secs / 60.0);
        self.telemetry.add_distance(self.config.speed_mps * secs);
        self.telemetry.set_elapsed(self.active_secs);
    }

    /// Run until the shutdown flag flips to `true`.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "simulated workout started: sample every {}ms",
            self.sample_interval.as_millis()
        );
        let mut ticker = tokio::time::interval(self.sample_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step(self.sample_interval);
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("simulated workout stopped after {:.0}s active", self.active_secs);
    }
}
