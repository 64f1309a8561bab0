//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API over the download queue:
//! submitting tasks, inspecting and mutating the queue, and a server-sent
//! event stream mirroring the broadcast channel.

use crate::config::ApiConfig;
use crate::error::Result;
use crate::MediaDownloader;
use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
/// ## Downloads
/// - `POST /downloads` - Submit a download task
/// - `GET /downloads/:id` - Get a single task
/// - `POST /downloads/:id/cancel` - Cancel a task
/// - `DELETE /downloads/:id` - Remove a task
///
/// ## Queue
/// - `GET /queue` - Snapshot of active/pending/finished tasks
/// - `DELETE /queue/completed` - Drop finished tasks
///
/// ## Configuration & History
/// - `GET /locations` - Configured download locations
/// - `GET /history` - Completed-download history
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(downloader: Arc<MediaDownloader>, api_config: &ApiConfig) -> Router {
    let state = AppState::new(downloader);

    let router = Router::new()
        // Downloads
        .route("/downloads", post(routes::add_download))
        .route("/downloads/:id", get(routes::get_download))
        .route("/downloads/:id", delete(routes::delete_download))
        .route("/downloads/:id/cancel", post(routes::cancel_download))
        // Queue
        .route("/queue", get(routes::get_queue))
        .route("/queue/completed", delete(routes::clear_completed))
        // Configuration & History
        .route("/locations", get(routes::get_locations))
        .route("/history", get(routes::get_history))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled (served from its own spec path so
    // it cannot collide with the /openapi.json route above)
    let router = if api_config.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    if api_config.cors_enabled {
        router.layer(build_cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Allows the specified origins ("*" or an empty list means any origin),
/// all methods and all headers.
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
/// Reads the `api` section of the configuration once at startup (API
/// settings are not hot-reloaded), binds a TCP listener and serves until
/// the task is aborted or the process shuts down.
pub async fn start_api_server(downloader: Arc<MediaDownloader>) -> Result<()> {
    let api_config = downloader.current_config().await.api;
    let bind_address = api_config.bind_address;

    let app = create_router(downloader, &api_config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
