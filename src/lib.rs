//! # media-dl
//!
//! Backend library for media download applications built around an external
//! downloader binary (yt-dlp or compatible).
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Single-flight** - One download runs at a time, strictly in submission order
//! - **Restart-safe de-duplication** - A JSON history file records every
//!   completed download and repeat requests are skipped
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding,
//!   with an optional REST API server
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{ConfigProvider, DownloadOptions, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(ConfigProvider::new("config.json")).await;
//!     let scheduler = downloader.start_scheduler();
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader
//!         .add_task(
//!             "https://example.com/watch?v=abc".to_string(),
//!             DownloadOptions::default(),
//!         )
//!         .await?;
//!
//!     scheduler.await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core queue manager implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Download history persistence
pub mod history;
/// External process supervision
pub mod supervisor;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, Config, ConfigProvider, ExtraArgs, Location};
pub use downloader::{format_key, MediaDownloader};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use history::HistoryStore;
pub use supervisor::{ProcessSupervisor, RunOutcome, RunSpec};
pub use types::{
    DownloadOptions, Event, HistoryEntry, QueueSnapshot, Status, Task, TaskId,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{ConfigProvider, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(ConfigProvider::new("config.json")).await;
///     let _scheduler = downloader.start_scheduler();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) {
    wait_for_signal().await;
    downloader.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
