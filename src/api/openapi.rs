//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the log export REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the log export REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "log-download-manager REST API",
        version = "0.1.0",
        description = "Asynchronous export of application logs into downloadable zip archives",
        license(
            name = "Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8941", description = "Local development server")
    ),
    paths(
        // Exports
        crate::api::routes::submit_export,
        crate::api::routes::check_export,
        crate::api::routes::list_exports,

        // Download
        crate::api::routes::download_archive,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::RequestId,
        crate::types::DownloadState,
        crate::types::SortOrder,
        crate::types::LogFilters,
        crate::types::DownloadLogRequest,
        crate::types::DownloadLogResponse,
        crate::types::DownloadLogResponseList,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "logs", description = "Log exports - Start exports and poll their state"),
        (name = "download", description = "Archive download - Requires a bearer token"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Download path as declared on the handler (default prefix)
const DEFAULT_DOWNLOAD_PATH: &str = "/logs/download/{file}";

impl ApiDoc {
    /// OpenAPI document with the download path moved under `prefix`
    pub fn with_download_prefix(prefix: &str) -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        if let Some(item) = doc.paths.paths.remove(DEFAULT_DOWNLOAD_PATH) {
            doc.paths.paths.insert(format!("{prefix}{{file}}"), item);
        }
        doc
    }
}

/// Security addon documenting the bearer token required by the download route
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer_token",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
