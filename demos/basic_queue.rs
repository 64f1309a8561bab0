//! Basic queue example
//!
//! This example demonstrates the core functionality of media-dl:
//! - Creating a downloader instance from a config file
//! - Starting the scheduler and API server
//! - Subscribing to events
//! - Adding a download to the queue

use media_dl::{ConfigProvider, DownloadOptions, Event, MediaDownloader};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Config is read from this path on every scheduling cycle; a missing
    // file means defaults (yt-dlp on PATH, ./downloads, ./history.json)
    let downloader = Arc::new(MediaDownloader::new(ConfigProvider::new("config.json")).await);

    let scheduler = downloader.start_scheduler();
    let _api = downloader.spawn_api_server();

    // Subscribe to events
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Queued { id, url } => {
                    println!("queued #{id}: {url}");
                }
                Event::Started { id } => {
                    println!("started #{id}");
                }
                Event::Progress { id, progress } => {
                    println!("#{id}: {progress}");
                }
                Event::Completed { id } => {
                    println!("completed #{id}");
                }
                Event::Skipped { id } => {
                    println!("skipped #{id} (already downloaded)");
                }
                Event::Failed { id, error } => {
                    eprintln!("failed #{id}: {error}");
                }
                other => {
                    println!("{other:?}");
                }
            }
        }
    });

    // Queue an audio extraction
    let options = DownloadOptions {
        audio_only: true,
        audio_format: Some("mp3".to_string()),
        ..Default::default()
    };
    downloader
        .add_task("https://example.com/watch?v=abc".to_string(), options)
        .await?;

    // Run until Ctrl+C, then wind down gracefully
    media_dl::run_with_shutdown((*downloader).clone()).await;
    scheduler.await?;
    Ok(())
}
