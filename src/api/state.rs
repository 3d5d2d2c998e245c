//! Application state for the API server

use crate::{Config, LogDownloadManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the manager instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The log download manager
    pub manager: Arc<LogDownloadManager>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<LogDownloadManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
