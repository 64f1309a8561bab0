//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the media-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.2.0",
        description = "REST API for managing a media download queue backed by an external downloader binary",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8790", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::add_download,
        crate::api::routes::get_download,
        crate::api::routes::cancel_download,
        crate::api::routes::delete_download,

        // Queue
        crate::api::routes::get_queue,
        crate::api::routes::clear_completed,

        // Configuration & History
        crate::api::routes::get_locations,
        crate::api::routes::get_history,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::Status,
        crate::types::DownloadOptions,
        crate::types::Task,
        crate::types::QueueSnapshot,
        crate::types::HistoryEntry,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Location,

        // Request/response envelopes
        crate::api::routes::AddDownloadRequest,
        crate::api::routes::UrlList,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Individual task management"),
        (name = "queue", description = "Queue-wide operations"),
        (name = "config", description = "Locations and history"),
        (name = "system", description = "Health, events and documentation")
    )
)]
pub struct ApiDoc;
