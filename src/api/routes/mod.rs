//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Individual task management
//! - [`queue`] - Queue-wide operations
//! - [`config`] - Locations and history
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod config;
mod downloads;
mod queue;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use config::*;
pub use downloads::*;
pub use queue::*;
pub use system::*;

/// Request body for POST /downloads
#[derive(Clone, Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddDownloadRequest {
    /// Source URL(s) to download; one task is queued per URL
    pub urls: UrlList,

    /// Download options applied to every queued task (camelCase keys)
    #[serde(default)]
    pub options: crate::types::DownloadOptions,
}

/// One URL or a list of them
#[derive(Clone, Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum UrlList {
    /// A single URL
    Single(String),
    /// A batch of URLs
    Many(Vec<String>),
}

impl UrlList {
    /// Flatten into a list of URLs
    pub fn into_vec(self) -> Vec<String> {
        match self {
            UrlList::Single(url) => vec![url],
            UrlList::Many(urls) => urls,
        }
    }
}
