use super::*;
use crate::config::ApiConfig;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod queue;

/// Router over an idle downloader (no scheduler running), plus the handles
/// tests need to poke at the queue directly.
async fn test_app() -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = crate::downloader::test_helpers::create_idle_downloader().await;
    let downloader = Arc::new(downloader);
    let app = create_router(downloader.clone(), &ApiConfig::default());
    (app, downloader, temp_dir)
}

/// Build a JSON POST request
fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as parsed JSON
async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_cors_headers_present_when_enabled() {
    let (app, _downloader, _temp_dir) = test_app().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present with default config"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _downloader, _temp_dir) = test_app().await;

    let request = Request::builder()
        .uri("/no-such-route")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
