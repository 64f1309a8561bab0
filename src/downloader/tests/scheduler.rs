//! End-to-end scheduling tests against fake downloader scripts.

use super::{terminal_for, wait_for_event};
use crate::downloader::test_helpers::{
    create_test_downloader, create_test_downloader_with, ALWAYS_FAIL, QUICK_SUCCESS,
};
use crate::types::{DownloadOptions, Event, Status};

#[tokio::test]
async fn test_successful_download_reaches_completed() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    wait_for_event(&mut events, terminal_for(task.id)).await;

    let finished = downloader.get_task(task.id).await.unwrap();
    assert_eq!(finished.status, Status::Completed);
    assert_eq!(finished.progress, "100%");
    assert!(finished.error.is_none());
    assert!(
        finished.logs.iter().any(|l| l.contains("[download]")),
        "downloader output should be captured in logs"
    );
}

#[tokio::test]
async fn test_progress_updates_stream_while_running() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    let progress = wait_for_event(&mut events, |e| {
        matches!(e, Event::Progress { id, .. } if *id == task.id)
    })
    .await;
    let Event::Progress { progress, .. } = progress else {
        unreachable!();
    };
    assert!(progress.ends_with('%'));
}

#[tokio::test]
async fn test_failed_download_carries_stderr_detail() {
    let (downloader, _temp_dir) = create_test_downloader_with(ALWAYS_FAIL).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/broken".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    let event = wait_for_event(&mut events, terminal_for(task.id)).await;
    let Event::Failed { error, .. } = event else {
        panic!("expected a failed event, got: {:?}", event);
    };
    assert!(
        error.contains("unsupported url"),
        "failure detail should include the stderr tail, got: {}",
        error
    );

    let finished = downloader.get_task(task.id).await.unwrap();
    assert_eq!(finished.status, Status::Failed);
    assert_eq!(finished.progress, "Failed");
    assert!(finished.error.is_some());
}

#[tokio::test]
async fn test_tasks_run_strictly_in_submission_order() {
    let (downloader, _temp_dir) = create_test_downloader_with(QUICK_SUCCESS).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let mut ids = Vec::new();
    for n in 0..3 {
        // Distinct URLs so de-duplication does not reorder outcomes
        let task = downloader
            .add_task(format!("https://example.com/v/{n}"), DownloadOptions::default())
            .await
            .unwrap();
        ids.push(task.id);
    }

    let mut started_order = Vec::new();
    while started_order.len() < 3 {
        let event = wait_for_event(&mut events, |e| matches!(e, Event::Started { .. })).await;
        if let Event::Started { id } = event {
            started_order.push(id);
        }
    }
    assert_eq!(started_order, ids, "tasks must start in FIFO order");
}

#[tokio::test]
async fn test_failure_does_not_block_later_tasks() {
    let (downloader, _temp_dir) = create_test_downloader_with(ALWAYS_FAIL).await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let first = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    let second = downloader
        .add_task("https://example.com/v/2".to_string(), DownloadOptions::default())
        .await
        .unwrap();

    wait_for_event(&mut events, terminal_for(first.id)).await;
    wait_for_event(&mut events, terminal_for(second.id)).await;

    assert_eq!(
        downloader.get_task(second.id).await.unwrap().status,
        Status::Failed
    );
    assert!(downloader.queue_snapshot().await.active.is_none());
}

#[tokio::test]
async fn test_unknown_location_name_falls_back_to_first() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let options = DownloadOptions {
        location_name: Some("no-such-location".to_string()),
        ..Default::default()
    };
    let task = downloader
        .add_task("https://example.com/v/1".to_string(), options)
        .await
        .unwrap();

    wait_for_event(&mut events, terminal_for(task.id)).await;
    assert_eq!(
        downloader.get_task(task.id).await.unwrap().status,
        Status::Completed
    );
}

#[tokio::test]
async fn test_escaping_filename_fails_before_spawn() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let options = DownloadOptions {
        filename: Some("../../outside/evil.mp4".to_string()),
        ..Default::default()
    };
    let task = downloader
        .add_task("https://example.com/v/1".to_string(), options)
        .await
        .unwrap();

    let event = wait_for_event(&mut events, terminal_for(task.id)).await;
    let Event::Failed { error, .. } = event else {
        panic!("expected a failed event, got: {:?}", event);
    };
    assert!(
        error.contains("outside"),
        "error should name the path violation, got: {}",
        error
    );

    let finished = downloader.get_task(task.id).await.unwrap();
    assert_eq!(finished.status, Status::Failed);
    // Rejected before any process ran, so no downloader output exists
    assert!(finished.logs.is_empty());
}

#[tokio::test]
async fn test_completed_task_appears_in_finished_bucket() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();
    let _scheduler = downloader.start_scheduler();

    let task = downloader
        .add_task("https://example.com/v/1".to_string(), DownloadOptions::default())
        .await
        .unwrap();
    wait_for_event(&mut events, terminal_for(task.id)).await;

    let snapshot = downloader.queue_snapshot().await;
    assert!(snapshot.active.is_none());
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.completed.len(), 1);
    assert_eq!(snapshot.completed[0].id, task.id);
}
