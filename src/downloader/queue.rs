//! Queue mutation and inspection operations.
//!
//! All operations lock the shared [`QueueState`](super::QueueState) briefly
//! and never hold the guard across an await that could block on the
//! downloader process.

use super::MediaDownloader;
use crate::error::{Error, Result};
use crate::types::{Event, QueueSnapshot, Status, Task, TaskId, SNAPSHOT_TERMINAL_LIMIT};
use std::sync::atomic::Ordering;

impl MediaDownloader {
    /// Enqueue a new download task.
    ///
    /// The task enters the queue in `Queued` state at the back (strict FIFO)
    /// and the scheduler is woken. Returns [`Error::ShuttingDown`] once
    /// shutdown has begun.
    pub async fn add_task(&self, url: String, options: crate::types::DownloadOptions) -> Result<Task> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let task = Task::new(id, url.clone(), options);

        {
            let mut state = self.state.lock().await;
            state.tasks.push(task.clone());
        }

        tracing::info!(task_id = %id, url = %url, "Task queued");
        self.emit_event(Event::Queued { id, url });
        self.wake.notify_one();

        Ok(task)
    }

    /// Cancel a task.
    ///
    /// A queued task moves straight to `Cancelled`; a downloading task has
    /// its process interrupted via the cancellation token and the scheduler
    /// records the terminal state once the process exits. Returns `false`
    /// when the task does not exist or is already terminal.
    pub async fn cancel_task(&self, id: TaskId) -> bool {
        let mut state = self.state.lock().await;

        let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };

        match task.status {
            Status::Queued => {
                task.status = Status::Cancelled;
                task.progress = "Cancelled".to_string();
                task.push_log("Cancelled before start".to_string());
                drop(state);
                tracing::info!(task_id = %id, "Queued task cancelled");
                self.emit_event(Event::Cancelled { id });
                true
            }
            Status::Downloading => {
                // Flip status here so a second cancel is a no-op; the
                // scheduler sees Cancelled and skips its own bookkeeping.
                task.status = Status::Cancelled;
                task.progress = "Cancelled".to_string();
                if let Some(token) = state.active_cancel.take() {
                    token.cancel();
                }
                drop(state);
                tracing::info!(task_id = %id, "Active task cancelled, interrupting process");
                self.emit_event(Event::Cancelled { id });
                true
            }
            _ => false,
        }
    }

    /// Remove a task from the queue entirely.
    ///
    /// An active task is cancelled first, then dropped from the list. The
    /// task id is never reused. Returns `false` for unknown ids.
    pub async fn remove_task(&self, id: TaskId) -> bool {
        {
            let state = self.state.lock().await;
            let Some(task) = state.tasks.iter().find(|t| t.id == id) else {
                return false;
            };
            if task.status == Status::Downloading {
                drop(state);
                self.cancel_task(id).await;
            }
        }

        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        let removed = state.tasks.len() < before;
        drop(state);

        if removed {
            tracing::info!(task_id = %id, "Task removed");
            self.emit_event(Event::Removed { id });
        }
        removed
    }

    /// Snapshot the queue grouped by lifecycle stage.
    ///
    /// `active` holds the one downloading task if any, `pending` the queued
    /// tasks in FIFO order, and `completed` the most recent terminal tasks
    /// (completed, failed or skipped) capped at a fixed count, oldest first.
    /// Cancelled tasks stay in the task list but are not reported in any
    /// bucket.
    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;

        let active = state
            .tasks
            .iter()
            .find(|t| t.status == Status::Downloading)
            .cloned();

        let pending: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.status == Status::Queued)
            .cloned()
            .collect();

        let mut completed: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| {
                matches!(
                    t.status,
                    Status::Completed | Status::Failed | Status::Skipped
                )
            })
            .cloned()
            .collect();
        // Keep the most recent entries but preserve submission order
        if completed.len() > SNAPSHOT_TERMINAL_LIMIT {
            completed.drain(..completed.len() - SNAPSHOT_TERMINAL_LIMIT);
        }

        QueueSnapshot {
            active,
            pending,
            completed,
        }
    }

    /// Look up a single task by id
    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        let state = self.state.lock().await;
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Drop all terminal tasks from the list.
    ///
    /// Retains only queued and downloading tasks; everything else, cancelled
    /// included, is forgotten. Returns the number of tasks removed.
    pub async fn clear_completed(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state
            .tasks
            .retain(|t| matches!(t.status, Status::Queued | Status::Downloading));
        let removed = before - state.tasks.len();
        drop(state);

        if removed > 0 {
            tracing::info!(count = removed, "Cleared finished tasks");
        }
        removed
    }
}
