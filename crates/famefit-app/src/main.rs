//! # famefit-app
//!
//! FameFit relay binary entry point.
//! Wires simulated telemetry, the loopback device channel, the metrics
//! relay and the phone-side receiver, then runs one group workout.

mod event_log;
mod flaky_peer;
mod lifecycle;
mod session;

use anyhow::Result;
use clap::Parser;
use famefit_core::config::AppConfig;
use famefit_core::config_manager::ConfigManager;
use famefit_core::models::workout::GroupWorkout;
use famefit_relay::clock::TokioClock;
use famefit_relay::loopback::loopback_pair;
use famefit_relay::receiver::MetricsReceiver;
use famefit_relay::relay::MetricsRelay;
use famefit_telemetry::live::LiveTelemetry;
use famefit_telemetry::simulated::SimulatedWorkout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::event_log::log_relay_events;
use crate::flaky_peer::drive_flaky_peer;
use crate::lifecycle::LifecycleManager;
use crate::session::GroupWorkoutCoordinator;

/// In-flight request buffer of the loopback channel
const PEER_BUFFER: usize = 32;

/// FameFit group-workout metrics relay
///
/// Runs a simulated group workout and relays its live metrics to an
/// in-process paired device.
#[derive(Parser, Debug)]
#[command(name = "famefit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay interval in seconds (overrides relay.interval_secs)
    #[arg(long, short = 'i')]
    interval: Option<u64>,

    /// Workout duration in seconds (overrides simulation.duration_secs)
    #[arg(long, short = 'd')]
    duration: Option<u64>,

    /// Periodically drop the paired device out of range and fail sends
    #[arg(long)]
    flaky_peer: bool,

    /// Pause the workout this many seconds after the start
    #[arg(long)]
    pause_at: Option<u64>,

    /// Length of the pause in seconds (with --pause-at)
    #[arg(long, default_value = "60")]
    pause_for: u64,

    /// Group workout display name
    #[arg(long, default_value = "Group run")]
    workout_name: String,

    /// Config file path (default: platform config directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// Load the config file and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new().or_else(|e| {
            warn!("config manager init failed, using temp config: {e}");
            ConfigManager::with_path(std::env::temp_dir().join("famefit").join("config.json"))
        })?,
    };
    info!("config file: {}", manager.config_path().display());

    let mut config = manager.get();
    if let Some(secs) = args.interval {
        config.relay.interval_secs = secs;
    }
    if let Some(secs) = args.duration {
        config.simulation.duration_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "famefit={},famefit_app={},famefit_core={},famefit_telemetry={},famefit_relay={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("FameFit relay starting");
    let config = load_config(&args)?;
    info!(
        "relay every {}s, max {} retries, breaker after {} unreachable ticks, queue capacity {}",
        config.relay.interval_secs,
        config.relay.max_retries,
        config.relay.unreachable_threshold,
        config.relay.pending_capacity
    );

    let lifecycle = LifecycleManager::new();

    // ── Adapters ──
    let telemetry = LiveTelemetry::new();
    let (channel, peer) = loopback_pair(PEER_BUFFER);
    let channel = Arc::new(channel);
    let receiver = Arc::new(MetricsReceiver::new());

    let relay = Arc::new(MetricsRelay::new(
        config.relay.clone(),
        Arc::new(telemetry.clone()),
        channel.clone(),
        Arc::new(TokioClock),
    ));
    let coordinator = Arc::new(GroupWorkoutCoordinator::new(relay, telemetry.clone()));
    let relay = coordinator.relay();

    // ── Background tasks ──
    let receiver_task = tokio::spawn(Arc::clone(&receiver).serve(peer, lifecycle.subscribe()));

    let simulation = SimulatedWorkout::new(
        config.simulation.clone(),
        telemetry.clone(),
        config.sample_interval(),
    );
    let simulation_task = tokio::spawn(simulation.run(lifecycle.subscribe()));

    let event_task = tokio::spawn(log_relay_events(relay.subscribe(), lifecycle.subscribe()));

    if args.flaky_peer {
        tokio::spawn(drive_flaky_peer(
            channel.clone(),
            config.relay.interval(),
            lifecycle.subscribe(),
        ));
    }

    // ── Workout ──
    let workout = GroupWorkout::new(args.workout_name.as_str());
    let workout_id = workout.workout_id.clone();
    if !coordinator.start(workout)? {
        warn!("relay did not start; metrics stay on this device");
    }

    if let Some(pause_at) = args.pause_at {
        let paused = Arc::clone(&coordinator);
        let pause_for = Duration::from_secs(args.pause_for);
        tokio::spawn(async move {
            paused
                .pause_window(Duration::from_secs(pause_at), pause_for)
                .await;
        });
    }

    let duration = Duration::from_secs(config.simulation.duration_secs);
    info!(
        "workout running for {}s (Ctrl+C to end early)",
        duration.as_secs()
    );
    tokio::select! {
        _ = lifecycle.wait_for_signal() => {}
        _ = tokio::time::sleep(duration) => {
            info!("workout duration elapsed");
        }
    }

    if lifecycle.is_shutting_down() {
        info!("workout ended early");
    }
    coordinator.end()?;
    let flushed = relay.flush_pending().await;
    if flushed > 0 {
        info!("final flush delivered {flushed} queued snapshots");
    }

    lifecycle.shutdown();
    let tally = event_task.await?;
    receiver_task.await?;
    simulation_task.await?;

    // ── Summary ──
    let stats = relay.stats();
    println!();
    println!("Relay summary ({workout_id})");
    println!("  phase           {}", stats.phase);
    println!("  delivered       {}", stats.delivered);
    println!("  queued          {}", stats.queued);
    println!("  evicted         {}", stats.evicted);
    println!("  not relayed     {}", stats.discarded);
    println!("  send failures   {}", stats.send_failures);
    println!("  still pending   {}", stats.pending);
    println!(
        "  events          {} delivered, {} retries, {} queued, {} flushes, {} trips ({} lagged)",
        tally.delivered, tally.retries, tally.queued, tally.flushes, tally.trips, tally.lagged
    );

    let received = receiver.stats();
    println!(
        "Receiver: {} accepted, {} stale, {} rejected",
        received.accepted, received.stale, received.rejected
    );
    if let Some(latest) = receiver.latest(&workout_id) {
        println!("Latest on peer: {}", serde_json::to_string_pretty(&latest)?);
    }

    info!("FameFit relay stopped");
    Ok(())
}
