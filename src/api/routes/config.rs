//! Location and history handlers.
//!
//! Both read the configuration fresh per request, mirroring the scheduler's
//! per-cycle reload, so operator edits are visible immediately.

use crate::api::AppState;
use crate::history::HistoryStore;
use axum::{extract::State, response::IntoResponse, Json};

/// GET /locations - Configured download locations
#[utoipa::path(
    get,
    path = "/locations",
    tag = "config",
    responses(
        (status = 200, description = "Configured download locations", body = Vec<crate::config::Location>)
    )
)]
pub async fn get_locations(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.downloader.current_config().await;
    Json(config.allowed_locations)
}

/// GET /history - Completed-download history
#[utoipa::path(
    get,
    path = "/history",
    tag = "config",
    responses(
        (status = 200, description = "History entries, oldest first", body = Vec<crate::types::HistoryEntry>)
    )
)]
pub async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.downloader.current_config().await;
    let history = HistoryStore::new(&config.history_path);
    Json(history.entries().await)
}
