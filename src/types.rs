//! Core types for log-download-manager

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for an export operation
///
/// Generated server-side (UUID v4); callers never choose it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh random request id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an export operation
///
/// ```text
/// Queued -> Generating -> Ready -> Downloaded
///                      \-> Error
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadState {
    /// Registered, the pipeline has not started yet
    Queued,
    /// The pipeline is draining the search capability
    Generating,
    /// Archive available for download until its expiration
    Ready,
    /// Generation failed; `info` carries the reason
    Error,
    /// The archive was delivered at least once
    Downloaded,
}

impl DownloadState {
    /// Upper-case wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Queued => "QUEUED",
            DownloadState::Generating => "GENERATING",
            DownloadState::Ready => "READY",
            DownloadState::Error => "ERROR",
            DownloadState::Downloaded => "DOWNLOADED",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    ///
    /// Re-entering `Generating` or `Downloaded` is accepted as a no-op so that
    /// repeated pipeline iterations and concurrent downloads do not fail.
    pub fn can_transition_to(&self, next: DownloadState) -> bool {
        use DownloadState::*;
        matches!(
            (self, next),
            (Queued, Generating)
                | (Queued, Error)
                | (Generating, Generating)
                | (Generating, Ready)
                | (Generating, Error)
                | (Ready, Downloaded)
                | (Downloaded, Downloaded)
        )
    }

    /// Terminal states the sweeper may reclaim once their retention elapses
    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadState::Error | DownloadState::Downloaded)
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DownloadState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(DownloadState::Queued),
            "GENERATING" => Ok(DownloadState::Generating),
            "READY" => Ok(DownloadState::Ready),
            "ERROR" => Ok(DownloadState::Error),
            "DOWNLOADED" => Ok(DownloadState::Downloaded),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown download state: {other}"
            ))),
        }
    }
}

/// Sort order requested for the exported entries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Oldest entries first
    #[default]
    Asc,
    /// Newest entries first
    Desc,
}

/// Application filters forwarded untouched to the search capability
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogFilters {
    /// Application descriptor identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_descriptor_id: Option<String>,
    /// Application instance identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_instance_id: Option<String>,
    /// Service group identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_group_id: Option<String>,
    /// Service group instance identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_group_instance_id: Option<String>,
    /// Service identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Service instance identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
    /// Free-text filter applied to the message body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_query_filter: Option<String>,
}

/// Request to export the log entries of a time range
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadLogRequest {
    /// Organization that owns the logs
    pub organization_id: String,
    /// Application filters
    #[serde(flatten)]
    pub filters: LogFilters,
    /// Range start, nanoseconds since the Unix epoch
    #[serde(default)]
    pub from: i64,
    /// Range end, nanoseconds since the Unix epoch (0 = now)
    #[serde(default)]
    pub to: i64,
    /// Order of the entries in the archive
    #[serde(default)]
    pub order: SortOrder,
    /// Prefix each line with timestamp and application metadata
    #[serde(default)]
    pub include_metadata: bool,
}

/// One export job as tracked by the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOperation {
    /// Organization that requested the export
    pub organization_id: String,
    /// Generated identifier
    pub request_id: RequestId,
    /// Current lifecycle state
    pub state: DownloadState,
    /// Creation time, nanoseconds since the Unix epoch
    pub created_at: i64,
    /// Requested range start (ns)
    pub from: i64,
    /// Requested range end (ns)
    pub to: i64,
    /// Deadline for downloading the archive (ns), only while Ready
    pub expiration: Option<i64>,
    /// Status or error detail
    pub info: String,
    /// Public download URL, only while Ready
    pub url: Option<String>,
    /// Directory holding this operation's working file and archive
    pub directory: PathBuf,
}

impl DownloadOperation {
    /// Ready and past its expiration at `now` (ns)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.state == DownloadState::Ready && self.expiration.is_some_and(|exp| exp < now)
    }

    /// Path of the final archive
    pub fn archive_path(&self) -> PathBuf {
        crate::utils::archive_path(&self.directory, &self.request_id)
    }

    /// Path of the intermediate working file
    pub fn working_path(&self) -> PathBuf {
        crate::utils::working_file_path(&self.directory, &self.request_id)
    }

    /// Public projection of the operation
    pub fn to_response(&self) -> DownloadLogResponse {
        DownloadLogResponse {
            organization_id: self.organization_id.clone(),
            request_id: self.request_id.clone(),
            from: self.from,
            to: self.to,
            state: self.state,
            expiration: self.expiration,
            info: self.info.clone(),
            url: self.url.clone(),
        }
    }
}

/// Public view of an export operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadLogResponse {
    /// Organization that requested the export
    pub organization_id: String,
    /// Generated identifier
    pub request_id: RequestId,
    /// Requested range start (ns)
    pub from: i64,
    /// Requested range end (ns)
    pub to: i64,
    /// Current lifecycle state
    pub state: DownloadState,
    /// Download deadline (ns), present only while READY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    /// Status or error detail
    #[serde(default)]
    pub info: String,
    /// Download URL, present only while READY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// List of export operations
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadLogResponseList {
    /// Operations of the organization, in no particular order
    pub responses: Vec<DownloadLogResponse>,
}
