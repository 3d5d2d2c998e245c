//! System handlers: health and OpenAPI.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "accepting_exports": !state.manager.is_shutting_down(),
    }))
}

/// GET /openapi.json - OpenAPI specification
///
/// The download path is reported under the configured prefix.
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec(State(state): State<AppState>) -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;

    Json(ApiDoc::with_download_prefix(
        &state.config.server.api.download_path_prefix,
    ))
}
