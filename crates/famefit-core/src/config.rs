//! Application configuration structs.
//!
//! Relay timing, retry/breaker thresholds, telemetry sampling and demo
//! simulation settings. Persisted as JSON by [`crate::config_manager`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Metrics relay settings
    #[serde(default)]
    pub relay: RelayConfig,
    /// Telemetry sampling settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Demo workout simulation settings
    #[serde(default)]
    pub simulation: SimulationConfig,
}

// ============================================================
// Relay
// ============================================================

/// Group-workout metrics relay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay timer period (seconds)
    #[serde(default = "default_relay_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive send failures before a snapshot is diverted to the queue
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff step; retry `n` waits `n * step` seconds
    #[serde(default = "default_retry_backoff_step_secs")]
    pub retry_backoff_step_secs: u64,
    /// Consecutive unreachable ticks that trip the circuit breaker
    #[serde(default = "default_unreachable_threshold")]
    pub unreachable_threshold: u32,
    /// Pending queue capacity (oldest evicted first)
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_relay_interval_secs(),
            max_retries: default_max_retries(),
            retry_backoff_step_secs: default_retry_backoff_step_secs(),
            unreachable_threshold: default_unreachable_threshold(),
            pending_capacity: default_pending_capacity(),
        }
    }
}

impl RelayConfig {
    /// Relay timer period as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Delay before retry number `retry_count` (1-based)
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        Duration::from_secs(self.retry_backoff_step_secs * u64::from(retry_count))
    }
}

// ============================================================
// Telemetry
// ============================================================

/// Telemetry sampling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// How often the health-data collector refreshes live values (ms)
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

// ============================================================
// Simulation
// ============================================================

/// Demo workout simulation settings (used by the `famefit` binary)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Total simulated workout length (seconds)
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Resting heart rate the simulation ramps up from (bpm)
    #[serde(default = "default_resting_heart_rate")]
    pub resting_heart_rate: f64,
    /// Steady-state heart rate during the workout (bpm)
    #[serde(default = "default_target_heart_rate")]
    pub target_heart_rate: f64,
    /// Simulated pace (meters per second)
    #[serde(default = "default_speed_mps")]
    pub speed_mps: f64,
    /// Simulated burn rate (kcal per minute)
    #[serde(default = "default_kcal_per_minute")]
    pub kcal_per_minute: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            resting_heart_rate: default_resting_heart_rate(),
            target_heart_rate: default_target_heart_rate(),
            speed_mps: default_speed_mps(),
            kcal_per_minute: default_kcal_per_minute(),
        }
    }
}

impl AppConfig {
    /// Default configuration
    pub fn default_config() -> Self {
        Self {
            relay: RelayConfig::default(),
            telemetry: TelemetryConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    /// Telemetry sampling period as a `Duration`
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.sample_interval_ms)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let checks: [(&str, bool); 5] = [
            ("relay.interval_secs", self.relay.interval_secs > 0),
            ("relay.max_retries", self.relay.max_retries > 0),
            ("relay.unreachable_threshold", self.relay.unreachable_threshold > 0),
            ("relay.pending_capacity", self.relay.pending_capacity > 0),
            (
                "telemetry.sample_interval_ms",
                self.telemetry.sample_interval_ms > 0,
            ),
        ];

        for (field, ok) in checks {
            if !ok {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.simulation.target_heart_rate < self.simulation.resting_heart_rate {
            return Err(CoreError::Validation {
                field: "simulation.target_heart_rate".to_string(),
                message: "must not be below resting_heart_rate".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// Default value functions
// ============================================================

fn default_relay_interval_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_step_secs() -> u64 {
    2
}
fn default_unreachable_threshold() -> u32 {
    5
}
fn default_pending_capacity() -> usize {
    10 // ~5 minutes of history at the default interval
}
fn default_sample_interval_ms() -> u64 {
    1_000
}
fn default_duration_secs() -> u64 {
    300
}
fn default_resting_heart_rate() -> f64 {
    72.0
}
fn default_target_heart_rate() -> f64 {
    148.0
}
fn default_speed_mps() -> f64 {
    2.8
}
fn default_kcal_per_minute() -> f64 {
    11.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_is_linear() {
        let relay = RelayConfig::default();
        assert_eq!(relay.retry_delay(1), Duration::from_secs(2));
        assert_eq!(relay.retry_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.relay, RelayConfig::default());
        assert_eq!(config.telemetry, TelemetryConfig::default());
    }

    #[test]
    fn partial_relay_section_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"relay": {"interval_secs": 10}}"#).unwrap();
        assert_eq!(config.relay.interval_secs, 10);
        assert_eq!(config.relay.pending_capacity, 10);
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = AppConfig::default_config();
        config.relay.pending_capacity = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation { ref field, .. } if field == "relay.pending_capacity"
        ));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default_config().validate().is_ok());
    }
}
