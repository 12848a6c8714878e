//! Port interfaces (traits).
//!
//! Adapter crates implement these traits and `famefit-app` wires them as
//! `Arc<dyn T>`. Async traits use the `async_trait` macro so they stay
//! object safe.

pub mod clock;
pub mod device_channel;
pub mod telemetry;
