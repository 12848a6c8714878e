//! # famefit-relay
//!
//! Group-workout metrics relay. Periodically pushes live workout telemetry
//! to the paired device, retrying transient send failures with linear
//! backoff, buffering undelivered snapshots in a bounded queue and giving
//! up (until the next session) once the peer has been unreachable for too
//! many consecutive ticks.
//!
//! ## Modules
//!
//! - [`relay`] — `MetricsRelay`, the timer-driven dispatcher
//! - [`pending_queue`] — bounded FIFO of undelivered snapshots
//! - [`retry`] — per-relay retry counter and backoff decisions
//! - [`breaker`] — one-shot reachability circuit breaker
//! - [`payload`] — snapshot ↔ channel payload codec
//! - [`loopback`] — in-process `DeviceChannel` adapter
//! - [`receiver`] — phone-side snapshot receiver
//! - [`events`] — relay phase, events and statistics
//! - [`clock`] — tokio-backed `RelayClock`

pub mod breaker;
pub mod clock;
pub mod events;
pub mod loopback;
pub mod payload;
pub mod pending_queue;
pub mod receiver;
pub mod relay;
pub mod retry;
