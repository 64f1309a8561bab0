//! Cancellation and shutdown behavior against a hanging fake downloader.

use super::{terminal_for, wait_for_event};
use crate::downloader::test_helpers::{create_test_downloader_with, HANG, QUICK_SUCCESS};
use crate::types::{DownloadOptions, Event, Status};
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn test_cancel_active_task_interrupts_process() {
    let (downloader, _temp_dir) = create_test_downloader_with(HANG).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, Event::Started { id } if *id == task.id)
    })
    .await;

    assert!(downloader.cancel_task(task.id).await);
    wait_for_event(&mut events, terminal_for(task.id)).await;

    let cancelled = downloader.get_task(task.id).await.unwrap();
    assert_eq!(cancelled.status, Status::Cancelled);
    assert_eq!(cancelled.progress, "Cancelled");
    assert!(cancelled.error.is_none(), "cancellation is not a failure");
}

#[tokio::test]
async fn test_cancel_releases_slot_for_next_task() {
    // First task hangs until cancelled, second must still run afterwards
    let (downloader, temp_dir) = create_test_downloader_with(HANG).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let hanging = downloader
        .add_task("https://example.com/v/hang".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    let queued = downloader
        .add_task("https://example.com/v/next".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    wait_for_event(&mut events, |e| {
        matches!(e, Event::Started { id } if *id == hanging.id)
    })
    .await;

    // Swap the fake binary to one that succeeds before the next task runs
    crate::downloader::test_helpers::write_fake_downloader(
        temp_dir.path(),
        "fake-dl",
        QUICK_SUCCESS,
    );

    downloader.cancel_task(hanging.id).await;
    wait_for_event(&mut events, terminal_for(queued.id)).await;

    assert_eq!(
        downloader.get_task(hanging.id).await.unwrap().status,
        Status::Cancelled
    );
    assert_eq!(
        downloader.get_task(queued.id).await.unwrap().status,
        Status::Completed
    );
}

#[tokio::test]
async fn test_remove_active_task_cancels_and_drops_it() {
    let (downloader, _temp_dir) = create_test_downloader_with(HANG).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, Event::Started { id } if *id == task.id)
    })
    .await;

    assert!(downloader.remove_task(task.id).await);
    assert!(downloader.get_task(task.id).await.is_none());

    wait_for_event(&mut events, |e| matches!(e, Event::Removed { id } if *id == task.id)).await;
}

#[tokio::test]
async fn test_shutdown_interrupts_active_and_stops_scheduler() {
    let (downloader, _temp_dir) = create_test_downloader_with(HANG).await;
    let mut events = downloader.subscribe();
    let scheduler = downloader.start_scheduler();

    let active = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    let pending = downloader
        .add_task("https://example.com/v/2".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    wait_for_event(&mut events, |e| {
        matches!(e, Event::Started { id } if *id == active.id)
    })
    .await;

    downloader.shutdown().await;
    wait_for_event(&mut events, |e| matches!(e, Event::Shutdown)).await;

    // The loop exits once the in-flight run winds down
    timeout(Duration::from_secs(10), scheduler)
        .await
        .expect("scheduler should stop after shutdown")
        .unwrap();

    assert_eq!(
        downloader.get_task(active.id).await.unwrap().status,
        Status::Cancelled
    );
    // Pending work is left queued, never started
    assert_eq!(
        downloader.get_task(pending.id).await.unwrap().status,
        Status::Queued
    );
}
