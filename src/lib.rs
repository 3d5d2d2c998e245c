//! # log-download-manager
//!
//! Asynchronous log export service: a caller asks for the log entries of an
//! organization over a time range, a background pipeline pages through the
//! log search backend into a plain-text file, compresses it into a zip
//! archive, and the archive is served once over an authenticated download
//! endpoint before it expires.
//!
//! ## Lifecycle of an export
//!
//! ```text
//! QUEUED -> GENERATING -> READY -> DOWNLOADED
//!               |           |
//!               v           +--(expiration)--> "Expired" (still READY, not downloadable)
//!             ERROR
//! ```
//!
//! Finished operations are reclaimed by the [`ExpirationSweeper`], which also
//! deletes their files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use log_download_manager::{Config, DownloadLogRequest, LogDownloadManager, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.auth.secret = std::env::var("AUTH_SECRET")?;
//!
//!     let manager = Arc::new(LogDownloadManager::with_http_search(config).await?);
//!     let _api = manager.spawn_api_server();
//!
//!     let queued = manager
//!         .submit(DownloadLogRequest {
//!             organization_id: "org-1".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("export {} queued", queued.request_id);
//!
//!     run_with_shutdown(manager).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export pipeline
pub mod export;
/// Service entry point
pub mod manager;
/// In-memory operation registry
pub mod registry;
/// Log search capability
pub mod search;
/// Expiration sweeper
pub mod sweeper;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use config::{ApiConfig, AuthConfig, Config, ExportConfig, SearchConfig};
pub use error::{ApiError, Error, ErrorDetail, Result, SearchError, ToHttpStatus};
pub use export::LogExporter;
pub use manager::LogDownloadManager;
pub use registry::OperationRegistry;
pub use search::{HttpLogSearch, LogEntry, LogSearch, SearchRequest, SearchResponse};
pub use sweeper::ExpirationSweeper;
pub use types::{
    DownloadLogRequest, DownloadLogResponse, DownloadLogResponseList, DownloadOperation,
    DownloadState, LogFilters, RequestId, SortOrder,
};

use std::sync::Arc;

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method,
/// which also stops an API server started with
/// [`spawn_api_server`](LogDownloadManager::spawn_api_server).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use log_download_manager::{Config, LogDownloadManager, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.auth.secret = "change-me".to_string();
///     let manager = Arc::new(LogDownloadManager::with_http_search(config).await?);
///     manager.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: Arc<LogDownloadManager>) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
