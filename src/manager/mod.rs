//! Top-level service wiring the registry, export pipeline, sweeper and API.

use crate::api::auth::AuthGate;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::LogExporter;
use crate::registry::OperationRegistry;
use crate::search::{HttpLogSearch, LogSearch};
use crate::sweeper::ExpirationSweeper;
use crate::types::{DownloadLogRequest, DownloadLogResponse, DownloadLogResponseList, RequestId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod lifecycle;

/// Log export service
///
/// Owns the operation registry, the export pipeline and the expiration
/// sweeper. Construct it once, share it as `Arc<LogDownloadManager>`, and call
/// [`shutdown`](Self::shutdown) before exiting.
///
/// # Example
///
/// ```no_run
/// use log_download_manager::{Config, LogDownloadManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.auth.secret = "change-me".to_string();
///
/// let manager = Arc::new(LogDownloadManager::with_http_search(config).await?);
/// let api = manager.spawn_api_server();
///
/// // ... later
/// manager.shutdown().await?;
/// api.abort();
/// # Ok(())
/// # }
/// ```
pub struct LogDownloadManager {
    /// Effective configuration
    pub config: Arc<Config>,
    registry: OperationRegistry,
    exporter: LogExporter,
    auth_gate: AuthGate,
    cancel_token: CancellationToken,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LogDownloadManager {
    /// Validate `config`, prepare the download directory and start the sweeper
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration or a download
    /// directory that cannot be created.
    pub async fn new(config: Config, search: Arc<dyn LogSearch>) -> Result<Self> {
        config.validate()?;
        let auth_gate = AuthGate::new(&config.auth)?;
        config.log_summary();

        tokio::fs::create_dir_all(config.download_dir())
            .await
            .map_err(|e| Error::Config {
                message: format!(
                    "cannot create download directory {}: {e}",
                    config.download_dir().display()
                ),
                key: Some("export.download_dir".to_string()),
            })?;

        let registry =
            OperationRegistry::new(config.download_url_base(), config.export.expiration_time);
        let exporter = LogExporter::new(
            registry.clone(),
            search.clone(),
            config.download_dir().clone(),
            config.export.search_timeout,
        );

        tracing::info!(backend = search.name(), "log search backend configured");

        let cancel_token = CancellationToken::new();
        let sweeper = ExpirationSweeper::new(
            registry.clone(),
            config.export.review_interval,
            config.export.alive_time,
        );
        let sweeper_handle = sweeper.spawn(cancel_token.child_token());

        Ok(Self {
            config: Arc::new(config),
            registry,
            exporter,
            auth_gate,
            cancel_token,
            sweeper_handle: Mutex::new(Some(sweeper_handle)),
        })
    }

    /// Same as [`new`](Self::new) with an [`HttpLogSearch`] built from `config.search`
    pub async fn with_http_search(config: Config) -> Result<Self> {
        let search = Arc::new(HttpLogSearch::new(&config.search)?);
        Self::new(config, search).await
    }

    /// Operation registry
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Verifier for download tokens
    pub fn auth_gate(&self) -> &AuthGate {
        &self.auth_gate
    }

    /// Token cancelled once [`shutdown`](Self::shutdown) is called
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start an export; see [`LogExporter::submit`]
    pub async fn submit(&self, request: DownloadLogRequest) -> Result<DownloadLogResponse> {
        self.exporter.submit(request).await
    }

    /// Status of one export; see [`LogExporter::check`]
    pub async fn check(
        &self,
        organization_id: &str,
        request_id: &RequestId,
    ) -> Result<DownloadLogResponse> {
        self.exporter.check(organization_id, request_id).await
    }

    /// Exports of an organization; see [`LogExporter::list`]
    pub async fn list(&self, organization_id: &str) -> Result<DownloadLogResponseList> {
        self.exporter.list(organization_id).await
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on `server.api.bind_address` (default: 127.0.0.1:8941).
    pub fn spawn_api_server(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedSearch, page, test_config, wait_for_outcome};
    use crate::types::DownloadState;

    #[tokio::test]
    async fn new_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.auth.secret.clear();

        let result = LogDownloadManager::new(config, Arc::new(ScriptedSearch::new(vec![]))).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn new_creates_download_directory() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("nested").join("downloads");
        let mut config = test_config(dir.path());
        config.export.download_dir = downloads.clone();

        let manager = LogDownloadManager::new(config, Arc::new(ScriptedSearch::new(vec![])))
            .await
            .unwrap();

        assert!(downloads.is_dir());
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn submitted_export_becomes_ready_and_is_listed() {
        let dir = tempfile::tempdir().unwrap();
        let search = Arc::new(ScriptedSearch::new(vec![page(&[(10, "hello")])]));
        let manager = LogDownloadManager::new(test_config(dir.path()), search)
            .await
            .unwrap();

        let response = manager
            .submit(DownloadLogRequest {
                organization_id: "org-1".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let op = wait_for_outcome(manager.registry(), &response.request_id).await;
        assert_eq!(op.state, DownloadState::Ready);
        assert!(
            op.url
                .unwrap()
                .starts_with("http://127.0.0.1:8941/logs/download/")
        );

        let checked = manager.check("org-1", &response.request_id).await.unwrap();
        assert_eq!(checked.state, DownloadState::Ready);
        assert_eq!(manager.list("org-1").await.unwrap().responses.len(), 1);

        manager.shutdown().await.unwrap();
    }
}
