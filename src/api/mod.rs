//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting log exports,
//! polling their status, and downloading the generated archives.

use crate::{Config, LogDownloadManager, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Exports
/// - `POST /api/v1/logs` - Start an export
/// - `GET /api/v1/logs/:organization_id` - List the exports of an organization
/// - `GET /api/v1/logs/:organization_id/:request_id` - Status of one export
///
/// ## Download (bearer token required)
/// - `GET {download_path_prefix}:request_id.zip` - Download a generated archive
///   (default prefix: `/logs/download/`)
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(manager: Arc<LogDownloadManager>, config: Arc<Config>) -> Router {
    let gate = manager.auth_gate().clone();
    let state = AppState::new(manager, config.clone());

    let api = Router::new()
        // Exports
        .route("/logs", post(routes::submit_export))
        .route("/logs/:organization_id", get(routes::list_exports))
        .route(
            "/logs/:organization_id/:request_id",
            get(routes::check_export),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Only the download route sits behind the token gate
    let download = Router::new()
        .route(
            &format!("{}:file", config.server.api.download_path_prefix),
            get(routes::download_archive),
        )
        .route_layer(middleware::from_fn_with_state(gate, auth::require_token));

    let router = Router::new().nest("/api/v1", api).merge(download);

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(
            "/api/v1/openapi.json",
            ApiDoc::with_download_prefix(&config.server.api.download_path_prefix),
        ))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Supports `"*"` for any origin; every method and header is allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Serves until the manager shuts down (see [`LogDownloadManager::shutdown`])
/// or the listener fails.
///
/// # Example
///
/// ```no_run
/// use log_download_manager::{Config, LogDownloadManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.auth.secret = "change-me".to_string();
/// let manager = Arc::new(LogDownloadManager::with_http_search(config).await?);
///
/// // Start API server (blocks until shutdown)
/// log_download_manager::api::start_api_server(manager.clone(), manager.config.clone()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<LogDownloadManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let shutdown = manager.shutdown_token();
    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
