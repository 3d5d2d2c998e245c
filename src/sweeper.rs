//! Expiration sweep for export operations
//!
//! This module provides the background task that reclaims operations whose
//! retention window has elapsed, together with their files on disk.
//!
//! # Retention rules
//!
//! - Ready and past its expiration: archive deleted, entry removed
//! - Error or Downloaded and created more than `alive_time` ago: archive and
//!   working file deleted, entry removed
//! - Queued and Generating: never touched
//!
//! # Example
//!
//! ```no_run
//! use log_download_manager::registry::OperationRegistry;
//! use log_download_manager::sweeper::ExpirationSweeper;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let registry = OperationRegistry::new("https://web.example.org/logs/download/", Duration::from_secs(600));
//! let sweeper = ExpirationSweeper::new(registry, Duration::from_secs(120), Duration::from_secs(720));
//!
//! let cancel_token = CancellationToken::new();
//! let handle = sweeper.spawn(cancel_token.clone());
//!
//! // ... later
//! cancel_token.cancel();
//! let _ = handle.await;
//! # }
//! ```

use crate::registry::OperationRegistry;
use crate::types::DownloadOperation;
use crate::utils::{duration_nanos, now_nanos, remove_file_if_exists};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic reclamation of expired and finished operations
pub struct ExpirationSweeper {
    registry: OperationRegistry,
    /// Interval between two sweeps
    review_interval: Duration,
    /// Retention of Error/Downloaded operations, counted from creation
    alive_time: Duration,
}

impl ExpirationSweeper {
    /// Creates a new sweeper over `registry`
    pub fn new(registry: OperationRegistry, review_interval: Duration, alive_time: Duration) -> Self {
        Self {
            registry,
            review_interval,
            alive_time,
        }
    }

    /// Run one sweep and return the number of removed operations
    ///
    /// Entries are removed from the registry first; file deletion happens
    /// afterwards and its failures are only logged.
    pub async fn sweep_once(&self) -> usize {
        let now = now_nanos();
        let alive = duration_nanos(self.alive_time);

        let removed = self
            .registry
            .remove_where(|op| is_reclaimable(op, now, alive))
            .await;

        for op in &removed {
            debug!(
                request_id = %op.request_id,
                state = %op.state,
                "reclaiming operation"
            );
            delete_artifact(&op.archive_path()).await;
            delete_artifact(&op.working_path()).await;
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "expiration sweep removed operations");
        }
        removed.len()
    }

    /// Sweep every `review_interval` until `cancel_token` is cancelled
    ///
    /// The first sweep happens one full interval after the start.
    pub async fn run(&self, cancel_token: CancellationToken) {
        info!(
            interval_secs = self.review_interval.as_secs(),
            "expiration sweeper started"
        );

        let start = tokio::time::Instant::now() + self.review_interval;
        let mut interval = tokio::time::interval_at(start, self.review_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }

        info!("expiration sweeper stopped");
    }

    /// Spawn [`run`](Self::run) on the runtime
    pub fn spawn(self, cancel_token: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel_token).await })
    }
}

fn is_reclaimable(op: &DownloadOperation, now: i64, alive: i64) -> bool {
    op.is_expired_at(now) || (op.state.is_finished() && op.created_at.saturating_add(alive) < now)
}

async fn delete_artifact(path: &Path) {
    match remove_file_if_exists(path).await {
        Ok(true) => debug!(path = %path.display(), "deleted export artifact"),
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete export artifact"),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DownloadState, RequestId};
    use std::path::PathBuf;

    const URL_BASE: &str = "http://127.0.0.1:8941/logs/download/";
    const LONG: Duration = Duration::from_secs(3600);

    async fn add(registry: &OperationRegistry, id: &str, dir: &Path) -> RequestId {
        let id = RequestId::from(id);
        registry
            .add("org-1", id.clone(), 0, 10, dir.to_path_buf())
            .await
            .unwrap();
        id
    }

    async fn advance(registry: &OperationRegistry, id: &RequestId, states: &[DownloadState]) {
        for state in states {
            registry.update(id, *state, "").await.unwrap();
        }
    }

    fn touch(path: PathBuf) -> PathBuf {
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[tokio::test]
    async fn expired_ready_is_removed_with_its_archive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, Duration::ZERO);
        let id = add(&registry, "expired", dir.path()).await;
        advance(&registry, &id, &[DownloadState::Generating, DownloadState::Ready]).await;
        let archive = touch(crate::utils::archive_path(dir.path(), &id));

        tokio::time::sleep(Duration::from_millis(2)).await;
        let sweeper = ExpirationSweeper::new(registry.clone(), LONG, LONG);

        assert_eq!(sweeper.sweep_once().await, 1);
        assert!(registry.get(&id).await.is_err());
        assert!(!archive.exists());

        assert_eq!(sweeper.sweep_once().await, 0, "second tick is a no-op");
    }

    #[tokio::test]
    async fn unexpired_ready_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, LONG);
        let id = add(&registry, "fresh", dir.path()).await;
        advance(&registry, &id, &[DownloadState::Generating, DownloadState::Ready]).await;

        let sweeper = ExpirationSweeper::new(registry.clone(), LONG, Duration::ZERO);

        assert_eq!(sweeper.sweep_once().await, 0);
        assert_eq!(registry.get(&id).await.unwrap().state, DownloadState::Ready);
    }

    #[tokio::test]
    async fn in_flight_operations_are_never_touched() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, Duration::ZERO);
        let queued = add(&registry, "queued", dir.path()).await;
        let generating = add(&registry, "generating", dir.path()).await;
        advance(&registry, &generating, &[DownloadState::Generating]).await;

        tokio::time::sleep(Duration::from_millis(2)).await;
        let sweeper = ExpirationSweeper::new(registry.clone(), LONG, Duration::ZERO);

        assert_eq!(sweeper.sweep_once().await, 0);
        assert!(registry.get(&queued).await.is_ok());
        assert!(registry.get(&generating).await.is_ok());
    }

    #[tokio::test]
    async fn finished_operations_are_kept_for_alive_time() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, LONG);
        let failed = add(&registry, "failed", dir.path()).await;
        advance(&registry, &failed, &[DownloadState::Generating, DownloadState::Error]).await;
        let downloaded = add(&registry, "downloaded", dir.path()).await;
        advance(
            &registry,
            &downloaded,
            &[
                DownloadState::Generating,
                DownloadState::Ready,
                DownloadState::Downloaded,
            ],
        )
        .await;

        let patient = ExpirationSweeper::new(registry.clone(), LONG, LONG);
        assert_eq!(patient.sweep_once().await, 0);

        let working = touch(crate::utils::working_file_path(dir.path(), &failed));
        let archive = touch(crate::utils::archive_path(dir.path(), &downloaded));
        tokio::time::sleep(Duration::from_millis(2)).await;

        let eager = ExpirationSweeper::new(registry.clone(), LONG, Duration::ZERO);
        assert_eq!(eager.sweep_once().await, 2);
        assert!(registry.is_empty().await);
        assert!(!working.exists());
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn deletion_failure_does_not_block_removal() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, Duration::ZERO);
        let blocked = add(&registry, "blocked", dir.path()).await;
        let other = add(&registry, "other", dir.path()).await;
        for id in [&blocked, &other] {
            advance(&registry, id, &[DownloadState::Generating, DownloadState::Ready]).await;
        }

        // a directory where the archive should be cannot be removed as a file
        let blocked_archive = crate::utils::archive_path(dir.path(), &blocked);
        std::fs::create_dir(&blocked_archive).unwrap();
        let other_archive = touch(crate::utils::archive_path(dir.path(), &other));

        tokio::time::sleep(Duration::from_millis(2)).await;
        let sweeper = ExpirationSweeper::new(registry.clone(), LONG, LONG);

        assert_eq!(sweeper.sweep_once().await, 2);
        assert!(registry.is_empty().await);
        assert!(blocked_archive.exists());
        assert!(!other_archive.exists());
    }

    #[tokio::test]
    async fn run_sweeps_on_interval_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OperationRegistry::new(URL_BASE, Duration::ZERO);
        let id = add(&registry, "expired", dir.path()).await;
        advance(&registry, &id, &[DownloadState::Generating, DownloadState::Ready]).await;

        let cancel_token = CancellationToken::new();
        let handle = ExpirationSweeper::new(registry.clone(), Duration::from_millis(20), LONG)
            .spawn(cancel_token.clone());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !registry.is_empty().await {
            assert!(tokio::time::Instant::now() < deadline, "sweeper never ran");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
