//! Telemetry source port.
//!
//! Implementations: `famefit-telemetry` crate (live store, simulation)

use crate::models::metrics::TelemetryReading;

/// Read access to the current workout telemetry.
///
/// Values are refreshed by the health-data collector outside the relay's
/// control; the relay only reads them once per tick.
pub trait TelemetrySource: Send + Sync {
    /// Current telemetry values
    fn current(&self) -> TelemetryReading;
}
