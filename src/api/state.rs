//! Application state for the API server

use crate::MediaDownloader;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clone). Configuration is not cached here;
/// handlers that need it load it fresh through the downloader, matching the
/// scheduler's hot-reload behavior.
#[derive(Clone)]
pub struct AppState {
    /// The main MediaDownloader instance
    pub downloader: Arc<MediaDownloader>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<MediaDownloader>) -> Self {
        Self { downloader }
    }
}
