//! Queue-wide operation handlers.

use crate::api::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// GET /queue - Snapshot of active/pending/finished tasks
#[utoipa::path(
    get,
    path = "/queue",
    tag = "queue",
    responses(
        (status = 200, description = "Current queue state", body = crate::types::QueueSnapshot)
    )
)]
pub async fn get_queue(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.queue_snapshot().await)
}

/// DELETE /queue/completed - Drop finished tasks
#[utoipa::path(
    delete,
    path = "/queue/completed",
    tag = "queue",
    responses(
        (status = 204, description = "Finished tasks dropped")
    )
)]
pub async fn clear_completed(State(state): State<AppState>) -> impl IntoResponse {
    state.downloader.clear_completed().await;
    StatusCode::NO_CONTENT
}
