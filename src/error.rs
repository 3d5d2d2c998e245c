//! Error types for log-download-manager
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] taxonomy (invalid argument, not found, permission denied, ...)
//! - [`SearchError`] for failures of the remote log-search capability
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::DownloadState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for log-download-manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for log-download-manager
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: empty identifiers, inverted ranges, bad download paths
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation with the same request id is already registered
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Unknown request id, or an organization that has no such operation
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation exists but cannot be served (not ready, expired, foreign organization)
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Missing or invalid credential, or the credential lacks a required capability
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// State change not allowed by the operation lifecycle
    #[error("operation {request_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Request id of the operation
        request_id: String,
        /// Current state
        from: DownloadState,
        /// Rejected target state
        to: DownloadState,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "auth.secret")
        key: Option<String>,
    },

    /// Remote log search failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Archive creation failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new exports
    #[error("shutdown in progress: not accepting new exports")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other internal error
    #[error("{0}")]
    Internal(String),
}

/// Failures of the remote log-search capability
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request never produced a response (connection refused, reset, DNS, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The search did not answer before its deadline
    #[error("search timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The search service answered with a non-success status
    #[error("search service returned {status}: {body}")]
    Status {
        /// HTTP status code returned by the search service
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The response body could not be decoded
    #[error("invalid search response: {0}")]
    Decode(String),

    /// The returned page would not move the pagination cursor forward
    #[error("search window did not advance: {0}")]
    WindowNotAdvancing(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            SearchError::Decode(error.to_string())
        } else {
            SearchError::Transport(error.to_string())
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "permission_denied",
///     "message": "permission denied: download operation is not ready. State (GENERATING)"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_argument")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::InvalidArgument(_) => 400,
            Error::Config { .. } => 400,

            // 401 / 403 / 404
            Error::Unauthenticated(_) => 401,
            Error::PermissionDenied(_) => 403,
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::AlreadyExists(_) => 409,
            Error::InvalidTransition { .. } => 409,

            // 502 Bad Gateway - the remote search capability failed
            Error::Search(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::AlreadyExists(_) => "already_exists",
            Error::NotFound(_) => "not_found",
            Error::PermissionDenied(_) => "permission_denied",
            Error::Unauthenticated(_) => "unauthenticated",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Config { .. } => "config_error",
            Error::Search(e) => match e {
                SearchError::Transport(_) => "search_unavailable",
                SearchError::Timeout(_) => "search_timeout",
                SearchError::Status { .. } => "search_failed",
                SearchError::Decode(_) => "search_invalid_response",
                SearchError::WindowNotAdvancing(_) => "search_invalid_window",
            },
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::InvalidTransition {
                request_id,
                from,
                to,
            } => Some(serde_json::json!({
                "request_id": request_id,
                "current_state": from,
                "requested_state": to,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Search(SearchError::Status { status, .. }) => Some(serde_json::json!({
                "upstream_status": status,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
