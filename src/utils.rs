//! Time and path helpers shared by the registry, pipeline and sweeper.

use crate::types::RequestId;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension of the intermediate working file
pub const WORKING_FILE_EXTENSION: &str = "file";

/// Extension of the final archive
pub const ARCHIVE_EXTENSION: &str = "zip";

/// One millisecond in nanoseconds; the pagination cursor skips this much past a window edge
pub const CURSOR_STEP_NANOS: i64 = 1_000_000;

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

/// Convert a duration into nanoseconds, saturating at `i64::MAX`
pub fn duration_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

/// Render a nanosecond timestamp as RFC 3339 (UTC)
pub fn format_nanos(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_nanos(timestamp).to_rfc3339()
}

/// `{dir}/{request_id}.file`
pub fn working_file_path(dir: &Path, request_id: &RequestId) -> PathBuf {
    dir.join(format!("{}.{}", request_id, WORKING_FILE_EXTENSION))
}

/// `{dir}/{request_id}.zip`
pub fn archive_path(dir: &Path, request_id: &RequestId) -> PathBuf {
    dir.join(format!("{}.{}", request_id, ARCHIVE_EXTENSION))
}

/// Remove a file, treating "already gone" as success
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
