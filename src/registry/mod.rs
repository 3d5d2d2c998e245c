//! In-memory registry of export operations.
//!
//! The registry is the single source of truth for the state of every export.
//! All access goes through one `tokio::sync::Mutex`; callers only ever receive
//! clones of the stored [`DownloadOperation`]s, so no task can observe a
//! half-applied update or keep a mutable alias to an entry.

use crate::error::{Error, Result};
use crate::types::{DownloadOperation, DownloadState, RequestId};
use crate::utils::{duration_nanos, now_nanos};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Info reported for a Ready operation whose archive is no longer downloadable
pub const EXPIRED_MSG: &str = "Expired";

/// Concurrent registry of export operations keyed by request id (cloneable, Arc-backed)
#[derive(Clone)]
pub struct OperationRegistry {
    operations: Arc<Mutex<HashMap<RequestId, DownloadOperation>>>,
    /// Prefix of public download URLs; `{request_id}.zip` is appended
    url_base: Arc<str>,
    /// How long an archive stays downloadable once Ready
    expiration_time: Duration,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new(url_base: impl Into<String>, expiration_time: Duration) -> Self {
        Self {
            operations: Arc::new(Mutex::new(HashMap::new())),
            url_base: Arc::from(url_base.into()),
            expiration_time,
        }
    }

    /// Register a new operation in state Queued
    ///
    /// Fails with [`Error::AlreadyExists`] if the request id is taken; the
    /// existing entry is left untouched.
    pub async fn add(
        &self,
        organization_id: &str,
        request_id: RequestId,
        from: i64,
        to: i64,
        directory: PathBuf,
    ) -> Result<DownloadOperation> {
        let mut operations = self.operations.lock().await;

        if operations.contains_key(&request_id) {
            return Err(Error::AlreadyExists(format!("operation {request_id}")));
        }

        let operation = DownloadOperation {
            organization_id: organization_id.to_string(),
            request_id: request_id.clone(),
            state: DownloadState::Queued,
            created_at: now_nanos(),
            from,
            to,
            expiration: None,
            info: String::new(),
            url: None,
            directory,
        };
        operations.insert(request_id, operation.clone());

        Ok(operation)
    }

    /// Fetch a copy of an operation
    ///
    /// A Ready operation past its expiration is reported with info
    /// [`EXPIRED_MSG`]; its state is not changed.
    pub async fn get(&self, request_id: &RequestId) -> Result<DownloadOperation> {
        let mut operations = self.operations.lock().await;

        let operation = operations
            .get_mut(request_id)
            .ok_or_else(|| Error::NotFound(format!("download operation {request_id}")))?;

        mark_if_expired(operation, now_nanos());

        Ok(operation.clone())
    }

    /// Overwrite the state and info of an operation
    ///
    /// Moving to Ready stamps the expiration and the public URL; moving away
    /// from Ready clears both. Transitions outside the lifecycle are rejected
    /// with [`Error::InvalidTransition`].
    pub async fn update(
        &self,
        request_id: &RequestId,
        state: DownloadState,
        info: impl Into<String>,
    ) -> Result<()> {
        let info = info.into();
        tracing::debug!(request_id = %request_id, %state, info = %info, "updating operation state");

        let mut operations = self.operations.lock().await;

        let operation = operations
            .get_mut(request_id)
            .ok_or_else(|| Error::NotFound(format!("operation {request_id}")))?;

        if !operation.state.can_transition_to(state) {
            return Err(Error::InvalidTransition {
                request_id: request_id.to_string(),
                from: operation.state,
                to: state,
            });
        }

        operation.state = state;
        operation.info = info;

        if state == DownloadState::Ready {
            operation.expiration =
                Some(now_nanos().saturating_add(duration_nanos(self.expiration_time)));
            operation.url = Some(format!("{}{}.zip", self.url_base, request_id));
        } else {
            operation.expiration = None;
            operation.url = None;
        }

        Ok(())
    }

    /// Remove an operation
    pub async fn remove(&self, request_id: &RequestId) -> Result<()> {
        let mut operations = self.operations.lock().await;

        operations
            .remove(request_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("operation {request_id}")))
    }

    /// Copies of all operations of an organization (empty when it has none)
    pub async fn list(&self, organization_id: &str) -> Vec<DownloadOperation> {
        let mut operations = self.operations.lock().await;
        let now = now_nanos();

        operations
            .values_mut()
            .filter(|op| op.organization_id == organization_id)
            .map(|op| {
                mark_if_expired(op, now);
                op.clone()
            })
            .collect()
    }

    /// Copies of every operation, in no particular order
    pub async fn snapshot(&self) -> Vec<DownloadOperation> {
        self.operations.lock().await.values().cloned().collect()
    }

    /// Atomically remove and return every operation matching `predicate`
    pub(crate) async fn remove_where<F>(&self, mut predicate: F) -> Vec<DownloadOperation>
    where
        F: FnMut(&DownloadOperation) -> bool,
    {
        let mut operations = self.operations.lock().await;

        let doomed: Vec<RequestId> = operations
            .values()
            .filter(|op| predicate(op))
            .map(|op| op.request_id.clone())
            .collect();

        doomed
            .iter()
            .filter_map(|id| operations.remove(id))
            .collect()
    }

    /// Drop every operation
    pub async fn clear(&self) {
        self.operations.lock().await.clear();
    }

    /// Number of registered operations
    pub async fn len(&self) -> usize {
        self.operations.lock().await.len()
    }

    /// Whether no operation is registered
    pub async fn is_empty(&self) -> bool {
        self.operations.lock().await.is_empty()
    }
}

fn mark_if_expired(operation: &mut DownloadOperation, now: i64) {
    if operation.is_expired_at(now) {
        operation.info = EXPIRED_MSG.to_string();
    }
}
