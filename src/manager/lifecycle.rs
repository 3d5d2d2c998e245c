//! Graceful shutdown.

use super::LogDownloadManager;
use crate::error::Result;
use crate::types::DownloadState;
use std::time::Duration;

/// How long shutdown waits for the sweeper to finish its current tick
const SWEEPER_STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl LogDownloadManager {
    /// Stop accepting exports and stop the sweeper
    ///
    /// Pipelines already running are not interrupted; their state is lost
    /// with the process. Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new exports
        self.exporter.stop_accepting();
        tracing::info!("Stopped accepting new exports");

        // 2. Stop the sweeper
        self.cancel_token.cancel();
        if let Some(handle) = self.sweeper_handle.lock().await.take() {
            match tokio::time::timeout(SWEEPER_STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => tracing::info!("Expiration sweeper stopped"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Expiration sweeper task failed"),
                Err(_) => tracing::warn!("Timeout waiting for expiration sweeper to stop"),
            }
        }

        // 3. Report what is lost with the process
        let in_flight = self
            .registry
            .snapshot()
            .await
            .iter()
            .filter(|op| matches!(op.state, DownloadState::Queued | DownloadState::Generating))
            .count();
        if in_flight > 0 {
            tracing::warn!(in_flight, "Exports still generating at shutdown");
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
