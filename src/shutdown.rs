//! Graceful Shutdown Module
//!
//! Listens for SIGINT/SIGTERM and fans the shutdown signal out to the
//! accept loop over a broadcast channel.

use crate::{Result, StaError};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Shutdown coordinator for graceful system shutdown
pub struct ShutdownCoordinator {
    shutdown_sender: broadcast::Sender<()>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);
        Self { shutdown_sender }
    }

    /// Get a shutdown receiver for components to listen on
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_sender.subscribe()
    }

    /// Block until SIGINT or SIGTERM arrives, then broadcast shutdown.
    pub async fn listen_for_shutdown(&self) -> Result<()> {
        let mut sigint =
            signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
                StaError::ConfigError(format!("failed to create SIGINT handler: {}", e))
            })?;
        let mut sigterm =
            signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
                StaError::ConfigError(format!("failed to create SIGTERM handler: {}", e))
            })?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, initiating graceful shutdown");
            }
        }

        self.initiate_shutdown();
        Ok(())
    }

    /// Broadcast the shutdown signal to all subscribers.
    pub fn initiate_shutdown(&self) {
        if let Err(e) = self.shutdown_sender.send(()) {
            // No active receivers; normal when components already stopped.
            debug!("shutdown signal not sent (no active receivers): {}", e);
        }
    }
}

/// Shutdown signal wrapper for components
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
    shutdown_requested: bool,
}

impl ShutdownSignal {
    pub fn new(receiver: broadcast::Receiver<()>) -> Self {
        Self {
            receiver,
            shutdown_requested: false,
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Wait for the shutdown signal.
    pub async fn wait_for_shutdown(&mut self) {
        // Any outcome (signal, closed, lagged) means it is time to stop.
        let _ = self.receiver.recv().await;
        self.shutdown_requested = true;
    }
}
