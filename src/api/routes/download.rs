//! Archive download handler.
//!
//! The archive is streamed straight from disk; the operation is marked
//! Downloaded only once the last chunk has been handed to the connection.

use crate::api::AppState;
use crate::api::auth::CallerIdentity;
use crate::error::{Error, Result};
use crate::registry::OperationRegistry;
use crate::types::{DownloadOperation, DownloadState, RequestId};
use crate::utils::{ARCHIVE_EXTENSION, now_nanos};
use axum::{
    Extension,
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::{StreamExt, future, stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::io::ReaderStream;

/// GET {prefix}:file - Download a generated archive
///
/// Declared under the default prefix; [`ApiDoc::with_download_prefix`](crate::api::ApiDoc::with_download_prefix)
/// moves it under the configured one.
#[utoipa::path(
    get,
    path = "/logs/download/{file}",
    tag = "download",
    params(
        ("file" = String, Path, description = "Archive name, `{request_id}.zip`")
    ),
    responses(
        (status = 200, description = "Archive content", content_type = "application/zip"),
        (status = 400, description = "Malformed archive name", body = crate::error::ApiError),
        (status = 401, description = "Missing or insufficient token", body = crate::error::ApiError),
        (status = 403, description = "Archive not ready, expired, or owned by another organization", body = crate::error::ApiError),
        (status = 404, description = "Unknown export or archive missing", body = crate::error::ApiError)
    ),
    security(("bearer_token" = []))
)]
pub async fn download_archive(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(file): Path<String>,
) -> Response {
    match serve_archive(state.manager.registry(), &caller, &file).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(file = %file, error = %e, "download refused");
            e.into_response()
        }
    }
}

async fn serve_archive(
    registry: &OperationRegistry,
    caller: &CallerIdentity,
    file: &str,
) -> Result<Response> {
    let request_id = parse_archive_name(file)?;
    let operation = registry.get(&request_id).await?;

    if operation.organization_id != caller.organization_id {
        return Err(Error::PermissionDenied(format!(
            "download operation {request_id} belongs to another organization"
        )));
    }
    ensure_downloadable(&operation, now_nanos())?;

    let path = operation.archive_path();
    let archive = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("archive for download operation {request_id}"))
        } else {
            Error::Io(e)
        }
    })?;
    let length = archive.metadata().await?.len();

    tracing::info!(
        request_id = %request_id,
        user_id = %caller.user_id,
        bytes = length,
        "serving archive"
    );

    let body = Body::from_stream(stream_then_mark_downloaded(
        archive,
        registry.clone(),
        request_id.clone(),
    ));

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{request_id}.{ARCHIVE_EXTENSION}\""),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response())
}

/// Split `{request_id}.zip` into its request id
fn parse_archive_name(file: &str) -> Result<RequestId> {
    match file.rsplit_once('.') {
        Some((id, ext)) if !id.is_empty() && ext == ARCHIVE_EXTENSION => Ok(RequestId::from(id)),
        _ => Err(Error::InvalidArgument(format!(
            "invalid download path: {file}, expected {{request_id}}.{ARCHIVE_EXTENSION}"
        ))),
    }
}

/// Only Ready, unexpired operations may be served
fn ensure_downloadable(operation: &DownloadOperation, now: i64) -> Result<()> {
    if operation.state != DownloadState::Ready {
        let detail = if operation.info.is_empty() {
            String::new()
        } else {
            format!(" - {}", operation.info)
        };
        return Err(Error::PermissionDenied(format!(
            "download operation is not ready. State ({}){detail}",
            operation.state
        )));
    }
    if operation.is_expired_at(now) {
        return Err(Error::PermissionDenied(
            "download operation is not ready. State (EXPIRED)".to_string(),
        ));
    }
    Ok(())
}

/// File chunks followed by a Downloaded transition once the file is exhausted
///
/// A read error ends the stream without marking the operation.
fn stream_then_mark_downloaded(
    archive: tokio::fs::File,
    registry: OperationRegistry,
    request_id: RequestId,
) -> impl futures::Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let failed = Arc::new(AtomicBool::new(false));
    let read_failed = failed.clone();

    let chunks = ReaderStream::new(archive).map(move |chunk| {
        if chunk.is_err() {
            read_failed.store(true, Ordering::SeqCst);
        }
        Some(chunk)
    });

    let completion = stream::once(async move {
        if failed.load(Ordering::SeqCst) {
            tracing::warn!(request_id = %request_id, "archive transfer failed");
        } else if let Err(e) = registry
            .update(&request_id, DownloadState::Downloaded, "")
            .await
        {
            tracing::warn!(request_id = %request_id, error = %e, "failed to mark operation downloaded");
        } else {
            tracing::info!(request_id = %request_id, "archive downloaded");
        }
        None
    });

    chunks.chain(completion).filter_map(future::ready)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn operation(state: DownloadState, info: &str, expiration: Option<i64>) -> DownloadOperation {
        DownloadOperation {
            organization_id: "org-1".into(),
            request_id: RequestId::from("abc"),
            state,
            created_at: 0,
            from: 0,
            to: 10,
            expiration,
            info: info.into(),
            url: expiration.map(|_| "http://x/abc.zip".to_string()),
            directory: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn archive_name_must_be_id_dot_zip() {
        assert_eq!(parse_archive_name("abc.zip").unwrap().as_str(), "abc");
        assert_eq!(parse_archive_name("a.b.zip").unwrap().as_str(), "a.b");

        for bad in ["abc", ".zip", "abc.tar", "abc."] {
            assert!(
                matches!(parse_archive_name(bad), Err(Error::InvalidArgument(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn only_fresh_ready_operations_are_downloadable() {
        ensure_downloadable(&operation(DownloadState::Ready, "", Some(100)), 50).unwrap();

        let err = ensure_downloadable(&operation(DownloadState::Ready, "", Some(100)), 101)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "permission denied: download operation is not ready. State (EXPIRED)"
        );

        for state in [
            DownloadState::Queued,
            DownloadState::Generating,
            DownloadState::Error,
            DownloadState::Downloaded,
        ] {
            let err = ensure_downloadable(&operation(state, "", None), 0).unwrap_err();
            assert!(matches!(err, Error::PermissionDenied(_)));
            assert!(err.to_string().contains(&format!("State ({state})")));
        }
    }

    #[test]
    fn refusal_message_carries_info() {
        let err = ensure_downloadable(
            &operation(DownloadState::Error, "transport error: refused", None),
            0,
        )
        .unwrap_err();
        assert!(
            err.to_string()
                .ends_with("State (ERROR) - transport error: refused")
        );
    }
}
