//! Export submission and status handlers.

use crate::api::AppState;
use crate::types::{DownloadLogRequest, RequestId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /logs - Start an export
#[utoipa::path(
    post,
    path = "/api/v1/logs",
    tag = "logs",
    request_body = crate::types::DownloadLogRequest,
    responses(
        (status = 202, description = "Export queued", body = crate::types::DownloadLogResponse),
        (status = 400, description = "Empty organization or inverted time range", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_export(
    State(state): State<AppState>,
    Json(request): Json<DownloadLogRequest>,
) -> Response {
    match state.manager.submit(request).await {
        Ok(response) => (StatusCode::ACCEPTED, Json(response)).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "export submission rejected");
            e.into_response()
        }
    }
}

/// GET /logs/:organization_id/:request_id - Status of one export
#[utoipa::path(
    get,
    path = "/api/v1/logs/{organization_id}/{request_id}",
    tag = "logs",
    params(
        ("organization_id" = String, Path, description = "Organization that owns the export"),
        ("request_id" = String, Path, description = "Export request id")
    ),
    responses(
        (status = 200, description = "Export status", body = crate::types::DownloadLogResponse),
        (status = 404, description = "Unknown export", body = crate::error::ApiError)
    )
)]
pub async fn check_export(
    State(state): State<AppState>,
    Path((organization_id, request_id)): Path<(String, String)>,
) -> Response {
    match state
        .manager
        .check(&organization_id, &RequestId::from(request_id))
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /logs/:organization_id - Every export of an organization
#[utoipa::path(
    get,
    path = "/api/v1/logs/{organization_id}",
    tag = "logs",
    params(
        ("organization_id" = String, Path, description = "Organization that owns the exports")
    ),
    responses(
        (status = 200, description = "Exports of the organization", body = crate::types::DownloadLogResponseList)
    )
)]
pub async fn list_exports(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> Response {
    match state.manager.list(&organization_id).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}
