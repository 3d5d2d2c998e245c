//! Traits and wire types for the remote log-search capability

use crate::error::SearchError;
use crate::types::{DownloadLogRequest, LogFilters, SortOrder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One bounded search over a time window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Organization that owns the logs
    pub organization_id: String,
    /// Application filters
    #[serde(flatten)]
    pub filters: LogFilters,
    /// Window start (ns, inclusive)
    pub from: i64,
    /// Window end (ns, inclusive)
    pub to: i64,
    /// Return the oldest entries of the window first (ascending export)
    pub n_first: bool,
    /// Return application metadata with every entry
    pub include_metadata: bool,
}

impl SearchRequest {
    /// First window of an export; `to` must already be resolved (never 0)
    pub fn from_download_request(request: &DownloadLogRequest, to: i64) -> Self {
        Self {
            organization_id: request.organization_id.clone(),
            filters: request.filters.clone(),
            from: request.from,
            to,
            n_first: request.order == SortOrder::Asc,
            include_metadata: request.include_metadata,
        }
    }
}

/// One log line as returned by the search capability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
    /// Message body
    pub msg: String,
    /// Application descriptor name (metadata)
    #[serde(default)]
    pub app_descriptor_name: String,
    /// Application instance name (metadata)
    #[serde(default)]
    pub app_instance_name: String,
    /// Service group name (metadata)
    #[serde(default)]
    pub service_group_name: String,
    /// Service name (metadata)
    #[serde(default)]
    pub service_name: String,
}

/// One page of results
///
/// `from`/`to` echo the window actually covered by `entries`; the pipeline
/// advances its cursor from them, so both are required on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Entries of the page, in no guaranteed order
    #[serde(default)]
    pub entries: Vec<LogEntry>,
    /// Timestamp of the oldest returned entry (ns)
    pub from: i64,
    /// Timestamp of the newest returned entry (ns)
    pub to: i64,
}

/// Paginated log search
///
/// Implementations return at most one bounded page per call. An empty page
/// means the window holds no further entries.
#[async_trait]
pub trait LogSearch: Send + Sync {
    /// Run one search over `request.from..=request.to`
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] if the service is unreachable, answers with a
    /// failure status, or returns a body that cannot be decoded.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
