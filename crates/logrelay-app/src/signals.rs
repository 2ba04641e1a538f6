//! OS signal handling for interrupting a relay run

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logrelay_core::prelude::*;

/// Spawn a task that cancels `shutdown` when a termination signal arrives
pub fn spawn_signal_handler(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = wait_for_signal() => {
                if let Err(e) = result {
                    error!("Signal handler error: {}", e);
                    return;
                }
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => {
                trace!("Signal handler no longer needed");
            }
        }
    })
}

/// Wait for a termination signal
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::signal(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::signal(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::signal(format!("Failed to listen for Ctrl+C: {}", e)))?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
