//! Shared test helpers: scripted search backends and state polling.

use crate::config::Config;
use crate::error::SearchError;
use crate::registry::OperationRegistry;
use crate::search::{LogEntry, LogSearch, SearchRequest, SearchResponse};
use crate::types::{DownloadOperation, DownloadState, RequestId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Secret shared by test configs and test tokens
pub(crate) const TEST_SECRET: &str = "test-secret";

/// Search backend replaying a fixed script of results, then empty pages
pub(crate) struct ScriptedSearch {
    script: Mutex<VecDeque<Result<SearchResponse, SearchError>>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    pub(crate) fn new(script: Vec<Result<SearchResponse, SearchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every window searched so far, in call order
    pub(crate) fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSearch for ScriptedSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Search backend that never answers
pub(crate) struct StalledSearch;

#[async_trait]
impl LogSearch for StalledSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

/// Page holding `(timestamp, msg)` entries in the given order; `from`/`to` span them
pub(crate) fn page(entries: &[(i64, &str)]) -> Result<SearchResponse, SearchError> {
    let from = entries.iter().map(|(ts, _)| *ts).min().unwrap_or_default();
    let to = entries.iter().map(|(ts, _)| *ts).max().unwrap_or_default();
    Ok(SearchResponse {
        entries: entries
            .iter()
            .map(|(timestamp, msg)| LogEntry {
                timestamp: *timestamp,
                msg: msg.to_string(),
                ..Default::default()
            })
            .collect(),
        from,
        to,
    })
}

/// Valid configuration rooted in `dir`
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.export.download_dir = dir.to_path_buf();
    config.auth.secret = TEST_SECRET.to_string();
    config
}

/// Poll until the operation leaves Queued/Generating (panics after 5s)
pub(crate) async fn wait_for_outcome(
    registry: &OperationRegistry,
    request_id: &RequestId,
) -> DownloadOperation {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let op = registry.get(request_id).await.unwrap();
        if !matches!(op.state, DownloadState::Queued | DownloadState::Generating) {
            return op;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "operation {request_id} still {}",
            op.state
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
