//! The scheduling loop: one dedicated task driving downloads one at a time.
//!
//! The loop is woken by a [`Notify`](tokio::sync::Notify) whenever the queue
//! changes and otherwise parks. Each cycle claims the oldest queued task,
//! runs the full lifecycle for it and releases the active slot before looking
//! at the queue again, so at most one downloader process ever runs.

use super::MediaDownloader;
use crate::history::HistoryStore;
use crate::supervisor::{parse_progress, OutputLine, RunOutcome, RunSpec};
use crate::types::{DownloadOptions, Event, Status, TaskId};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

/// Compact description of the quality/track choice for history keys.
///
/// Two requests with the same key produce interchangeable files, so the key
/// is what de-duplication compares. Audio extraction and resolution caps get
/// their own namespaces; an explicit format selector is used verbatim.
pub fn format_key(options: &DownloadOptions) -> String {
    if options.audio_only {
        format!(
            "audio-{}",
            options.audio_format.as_deref().unwrap_or("best")
        )
    } else if let Some(max_resolution) = options.max_resolution {
        format!("video-{max_resolution}")
    } else {
        options
            .format
            .clone()
            .unwrap_or_else(|| "best".to_string())
    }
}

impl MediaDownloader {
    /// Start the scheduling loop on a background task.
    ///
    /// The returned handle resolves after [`MediaDownloader::shutdown`] once
    /// any in-flight download has been wound down. Starting the scheduler
    /// twice would violate the single-active-task invariant; call this once.
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tracing::debug!("Scheduler loop started");
            loop {
                if !this.accepting_new.load(Ordering::SeqCst) {
                    tracing::debug!("Scheduler loop stopping");
                    break;
                }
                if this.run_cycle().await {
                    // Something reached a terminal state; look again
                    // immediately in case more work is queued.
                    continue;
                }
                this.wake.notified().await;
            }
        })
    }

    /// Process the oldest queued task, if any.
    ///
    /// Returns `true` when a task was driven to a terminal state (or was
    /// cancelled out from under us), `false` when the queue held no work.
    async fn run_cycle(&self) -> bool {
        let Some((id, url, options)) = ({
            let state = self.state.lock().await;
            state
                .tasks
                .iter()
                .find(|t| t.status == Status::Queued)
                .map(|t| (t.id, t.url.clone(), t.options.clone()))
        }) else {
            return false;
        };

        // Config is re-read per cycle so location, binary and history path
        // edits apply to the next task without a restart.
        let config = self.config_provider.load().await;
        let key = format_key(&options);
        let history = HistoryStore::new(&config.history_path);

        if !options.force && history.contains(&url, &key).await {
            self.finish_task(id, Status::Skipped, "Already downloaded", None)
                .await;
            tracing::info!(task_id = %id, url = %url, "Task skipped, already in history");
            self.emit_event(Event::Skipped { id });
            return true;
        }

        let output_dir = match config
            .resolve_location(options.location_name.as_deref())
            .and_then(|location| config.resolve_output_dir(location, options.filename.as_deref()))
        {
            Ok(dir) => dir,
            Err(e) => {
                let error = e.to_string();
                self.finish_task(id, Status::Failed, "Failed", Some(error.clone()))
                    .await;
                tracing::warn!(task_id = %id, error = %error, "Task rejected before spawn");
                self.emit_event(Event::Failed { id, error });
                return true;
            }
        };

        // Claim the active slot. A cancel may have landed since we peeked,
        // in which case the task is no longer ours to run.
        let cancel = CancellationToken::new();
        {
            let mut state = self.state.lock().await;
            let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
                return true;
            };
            if task.status != Status::Queued {
                return true;
            }
            task.status = Status::Downloading;
            task.progress = "0%".to_string();
            task.logs.clear();
            state.active = Some(id);
            state.active_cancel = Some(cancel.clone());
        }
        tracing::info!(task_id = %id, url = %url, "Task started");
        self.emit_event(Event::Started { id });

        let spec = RunSpec {
            url: url.clone(),
            options,
            output_dir,
            binary: config.downloader_path.clone(),
            extra_args: config.extra_args.clone(),
        };

        let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel();
        let run_fut = self.supervisor.run(&spec, cancel, line_tx);
        tokio::pin!(run_fut);

        let result = loop {
            tokio::select! {
                biased;
                maybe_line = line_rx.recv() => match maybe_line {
                    Some(line) => self.apply_output_line(id, line).await,
                    None => break run_fut.await,
                },
                result = &mut run_fut => {
                    // The supervisor joins its readers before returning, so
                    // everything still buffered is already in the channel.
                    while let Ok(line) = line_rx.try_recv() {
                        self.apply_output_line(id, line).await;
                    }
                    break result;
                }
            }
        };

        match result {
            Ok(RunOutcome::Success) => {
                let recorded = self
                    .finish_task(id, Status::Completed, "100%", None)
                    .await;
                if recorded {
                    if let Err(e) = history.append(&url, &key).await {
                        tracing::error!(task_id = %id, error = %e, "Failed to record history entry");
                    }
                    tracing::info!(task_id = %id, url = %url, "Task completed");
                    self.emit_event(Event::Completed { id });
                }
            }
            Ok(RunOutcome::Failed { exit_code, detail }) => {
                let recorded = self
                    .finish_task(id, Status::Failed, "Failed", Some(detail.clone()))
                    .await;
                if recorded {
                    tracing::warn!(task_id = %id, ?exit_code, "Task failed");
                    self.emit_event(Event::Failed { id, error: detail });
                }
            }
            Ok(RunOutcome::Cancelled) => {
                // cancel_task already set the status and emitted the event
                tracing::info!(task_id = %id, "Task run cancelled");
            }
            Err(e) => {
                let error = e.to_string();
                let recorded = self
                    .finish_task(id, Status::Failed, "Failed", Some(error.clone()))
                    .await;
                if recorded {
                    tracing::error!(task_id = %id, error = %error, "Downloader could not be started");
                    self.emit_event(Event::Failed { id, error });
                }
            }
        }

        let mut state = self.state.lock().await;
        state.active = None;
        state.active_cancel = None;
        true
    }

    /// Record a terminal state for a task unless it was cancelled meanwhile.
    ///
    /// Returns `true` when the transition was applied. Cancelled tasks keep
    /// their status: a cancel that raced the process exit must not be
    /// reported as a success or failure.
    async fn finish_task(
        &self,
        id: TaskId,
        status: Status,
        progress: &str,
        error: Option<String>,
    ) -> bool {
        let mut state = self.state.lock().await;
        let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if task.status == Status::Cancelled {
            return false;
        }
        task.status = status;
        task.progress = progress.to_string();
        task.error = error;
        true
    }

    /// Fold one line of downloader output into the task's state
    async fn apply_output_line(&self, id: TaskId, line: OutputLine) {
        let mut state = self.state.lock().await;
        let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
            return;
        };
        match line {
            OutputLine::Stdout(text) => {
                if let Some(progress) = parse_progress(&text) {
                    task.progress = progress.clone();
                    task.push_log(text);
                    drop(state);
                    self.emit_event(Event::Progress { id, progress });
                } else {
                    task.push_log(text);
                }
            }
            OutputLine::Stderr(text) => {
                task.push_log(format!("stderr: {text}"));
            }
        }
    }
}
