use super::{body_json, json_post, test_app};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_empty_queue_snapshot() {
    let (app, _downloader, _temp_dir) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["active"].is_null());
    assert_eq!(body["pending"], json!([]));
    assert_eq!(body["completed"], json!([]));
}

#[tokio::test]
async fn test_queue_snapshot_preserves_pending_order() {
    let (app, _downloader, _temp_dir) = test_app().await;

    for n in 0..3 {
        let response = app
            .clone()
            .oneshot(json_post(
                "/downloads",
                json!({"urls": format!("https://example.com/v/{n}")}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(Request::builder().uri("/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;

    let urls: Vec<&str> = body["pending"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["url"].as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/v/0",
            "https://example.com/v/1",
            "https://example.com/v/2",
        ]
    );
}

#[tokio::test]
async fn test_clear_completed_drops_cancelled_tasks() {
    let (app, downloader, _temp_dir) = test_app().await;

    let task = downloader
        .add_task(
            "https://example.com/v/1".to_string(),
            crate::types::DownloadOptions::default(),
        )
        .await
        .unwrap();
    downloader.cancel_task(task.id).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/queue/completed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(downloader.get_task(task.id).await.is_none());
}
