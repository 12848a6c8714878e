//! Workout telemetry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live workout values as exposed by the health-data collector.
///
/// Units: heart rate in bpm, energy in kcal, distance in meters,
/// elapsed time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub heart_rate: f64,
    pub average_heart_rate: f64,
    pub active_energy: f64,
    pub distance: f64,
    pub elapsed_time: f64,
    pub is_running: bool,
}

/// Point-in-time capture of telemetry for one group workout.
///
/// Built fresh on every relay tick and never mutated afterwards. Each
/// snapshot carries its own timestamp, so receivers must not rely on
/// arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub workout_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub active_energy: f64,
    pub distance: f64,
    pub elapsed_time: f64,
    pub average_heart_rate: f64,
    pub is_running: bool,
}

impl MetricsSnapshot {
    /// Copy `reading` verbatim into a snapshot. No unit conversion.
    pub fn capture(workout_id: &str, timestamp: DateTime<Utc>, reading: &TelemetryReading) -> Self {
        Self {
            workout_id: workout_id.to_string(),
            timestamp,
            heart_rate: reading.heart_rate,
            active_energy: reading.active_energy,
            distance: reading.distance,
            elapsed_time: reading.elapsed_time,
            average_heart_rate: reading.average_heart_rate,
            is_running: reading.is_running,
        }
    }

    /// Telemetry values carried by this snapshot
    pub fn reading(&self) -> TelemetryReading {
        TelemetryReading {
            heart_rate: self.heart_rate,
            average_heart_rate: self.average_heart_rate,
            active_energy: self.active_energy,
            distance: self.distance,
            elapsed_time: self.elapsed_time,
            is_running: self.is_running,
        }
    }
}
