//! Live telemetry store.
//!
//! The health-data collector writes samples here as they arrive; the relay
//! reads the latest values through the `TelemetrySource` port.

use famefit_core::models::metrics::TelemetryReading;
use famefit_core::ports::telemetry::TelemetrySource;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct LiveState {
    reading: TelemetryReading,
    heart_rate_sum: f64,
    heart_rate_samples: u64,
}

/// Shared, cloneable store of the current workout telemetry
#[derive(Debug, Clone, Default)]
pub struct LiveTelemetry {
    state: Arc<RwLock<LiveState>>,
}

impl LiveTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heart-rate sample and update the running average.
    ///
    /// Non-finite or non-positive samples are sensor glitches and ignored.
    pub fn record_heart_rate(&self, bpm: f64) {
        if !bpm.is_finite() || bpm <= 0.0 {
            debug!("ignoring heart rate sample: {bpm}");
            return;
        }
        let mut state = self.state.write();
        state.heart_rate_sum += bpm;
        state.heart_rate_samples += 1;
        state.reading.heart_rate = bpm;
        state.reading.average_heart_rate = state.heart_rate_sum / state.heart_rate_samples as f64;
    }

    /// Add burned energy (kcal)
    pub fn add_energy(&self, kcal: f64) {
        if kcal.is_finite() && kcal > 0.0 {
            self.state.write().reading.active_energy += kcal;
        }
    }

    /// Add covered distance (meters)
    pub fn add_distance(&self, meters: f64) {
        if meters.is_finite() && meters > 0.0 {
            self.state.write().reading.distance += meters;
        }
    }

    /// Set the session's elapsed time (seconds). Non-finite or negative
    /// values are ignored.
    pub fn set_elapsed(&self, secs: f64) {
        if !secs.is_finite() || secs < 0.0 {
            debug!("ignoring elapsed time: {secs}");
            return;
        }
        self.state.write().reading.elapsed_time = secs;
    }

    /// Set whether the session is currently recording
    pub fn set_running(&self, running: bool) {
        self.state.write().reading.is_running = running;
    }

    /// Clear all values (new session)
    pub fn reset(&self) {
        *self.state.write() = LiveState::default();
    }
}

impl TelemetrySource for LiveTelemetry {
    fn current(&self) -> TelemetryReading {
        self.state.read().reading
    }
}
