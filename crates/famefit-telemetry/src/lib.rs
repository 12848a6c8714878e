//! # famefit-telemetry
//!
//! Telemetry adapters implementing the `TelemetrySource` port.
//! [`live::LiveTelemetry`] holds the values the health-data collector
//! pushes; [`simulated::SimulatedWorkout`] feeds it with a synthetic
//! workout when no real collector is available.

pub mod live;
pub mod simulated;
