//! Lifecycle management.
//!
//! Startup/shutdown, signal handling.

use tokio::sync::watch;
use tracing::{info, warn};

/// Lifecycle manager
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// Clone of the shutdown receiver
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Broadcast shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !*self.shutdown_rx.borrow() {
            info!("shutdown requested");
        }
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Wait for an OS signal (SIGINT, SIGTERM), then broadcast shutdown.
    ///
    /// If no handler can be installed this never resolves; the workout
    /// then ends on its configured duration.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let (mut sigint, mut sigterm) =
                match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                    (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("failed to install signal handlers: {e}");
                        return std::future::pending().await;
                    }
                };

            tokio::select! {
                _ = sigint.recv() => {
                    info!("SIGINT received");
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to install Ctrl+C handler: {e}");
                return std::future::pending().await;
            }
            info!("Ctrl+C received");
        }

        self.shutdown();
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
