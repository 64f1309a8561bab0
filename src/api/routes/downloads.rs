//! Task management handlers.

use super::AddDownloadRequest;
use crate::api::AppState;
use crate::error::Error;
use crate::types::TaskId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// POST /downloads - Submit one or more download tasks
///
/// Accepts either a single URL or a batch and queues one task per URL.
/// When `alsoDownloadAudio` is set on a video request, a second audio-only
/// task is queued right after each primary task.
#[utoipa::path(
    post,
    path = "/downloads",
    tag = "downloads",
    request_body = AddDownloadRequest,
    responses(
        (status = 201, description = "Tasks queued", body = Vec<crate::types::Task>),
        (status = 422, description = "Invalid URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn add_download(
    State(state): State<AppState>,
    Json(request): Json<AddDownloadRequest>,
) -> Response {
    let urls = request.urls.into_vec();

    // Shape check only; whether the downloader supports the site is its call.
    // Reject the whole batch before queueing anything.
    for url in &urls {
        if url::Url::parse(url).is_err() {
            return Error::InvalidUrl(url.clone()).into_response();
        }
    }

    let mut tasks = Vec::with_capacity(urls.len());
    for url in urls {
        match state
            .downloader
            .add_task(url.clone(), request.options.clone())
            .await
        {
            Ok(task) => tasks.push(task),
            Err(e) => return e.into_response(),
        }

        if request.options.also_download_audio && !request.options.audio_only {
            let audio_options = crate::types::DownloadOptions {
                audio_only: true,
                also_download_audio: false,
                ..request.options.clone()
            };
            match state.downloader.add_task(url, audio_options).await {
                Ok(task) => tasks.push(task),
                Err(e) => return e.into_response(),
            }
        }
    }

    (StatusCode::CREATED, Json(tasks)).into_response()
}

/// GET /downloads/:id - Get a single task
#[utoipa::path(
    get,
    path = "/downloads/{id}",
    tag = "downloads",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task state", body = crate::types::Task),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_download(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.downloader.get_task(TaskId(id)).await {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => Error::NotFound(format!("task {id}")).into_response(),
    }
}

/// POST /downloads/:id/cancel - Cancel a task
#[utoipa::path(
    post,
    path = "/downloads/{id}/cancel",
    tag = "downloads",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task cancelled"),
        (status = 404, description = "Task not found or already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_download(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if state.downloader.cancel_task(TaskId(id)).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Error::NotFound(format!("cancellable task {id}")).into_response()
    }
}

/// DELETE /downloads/:id - Remove a task
#[utoipa::path(
    delete,
    path = "/downloads/{id}",
    tag = "downloads",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task removed"),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_download(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if state.downloader.remove_task(TaskId(id)).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Error::NotFound(format!("task {id}")).into_response()
    }
}
