//! Core queue manager implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Task list mutation and snapshots
//! - [`scheduler`] - The single scheduling loop driving task lifecycle
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;
mod queue;
mod scheduler;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::ConfigProvider;
use crate::error::Result;
use crate::supervisor::ProcessSupervisor;
use crate::types::{Event, Task, TaskId};

pub use scheduler::format_key;

/// Task list and active-slot state, guarded by one mutex.
///
/// Every queue mutation and every scheduling decision serializes on this
/// guard; the scheduler is the only writer of task execution state, so two
/// racing wakeups can never both declare a task active.
pub(crate) struct QueueState {
    /// All known tasks in submission order (terminal tasks included until trimmed)
    pub(crate) tasks: Vec<Task>,
    /// The task currently bound to a running downloader process
    pub(crate) active: Option<TaskId>,
    /// Cancellation token for the active task's process
    pub(crate) active_cancel: Option<tokio_util::sync::CancellationToken>,
}

/// Main download queue manager (cloneable - all fields are Arc-wrapped)
///
/// Owns the task list and the single-active-task invariant. Construct with
/// [`MediaDownloader::new`], then call [`MediaDownloader::start_scheduler`]
/// to begin executing queued tasks.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Shared queue state (task list + active slot)
    pub(crate) state: std::sync::Arc<tokio::sync::Mutex<QueueState>>,
    /// Wakes the scheduler after queue mutations
    pub(crate) wake: std::sync::Arc<tokio::sync::Notify>,
    /// Monotonic task id source; ids are never reused
    pub(crate) next_id: std::sync::Arc<std::sync::atomic::AtomicI64>,
    /// Flag to indicate whether new tasks are accepted (false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Loads the on-disk configuration fresh on every scheduling cycle
    pub(crate) config_provider: ConfigProvider,
    /// Spawns and supervises the external downloader
    pub(crate) supervisor: ProcessSupervisor,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance.
    ///
    /// Loads the configuration once to sanity-check the downloader binary
    /// (a bare name that is not on PATH gets a warning, not an error, since
    /// the operator may install it later). The scheduler is not started here;
    /// call [`MediaDownloader::start_scheduler`].
    pub async fn new(config_provider: ConfigProvider) -> Self {
        let config = config_provider.load().await;

        let binary = &config.downloader_path;
        if !binary.contains(std::path::MAIN_SEPARATOR) && which::which(binary).is_err() {
            tracing::warn!(
                binary = %binary,
                "Downloader binary not found on PATH; downloads will fail until it is installed"
            );
        }

        // Buffer size of 1000 events; slow subscribers see Lagged, never block us
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Self {
            state: std::sync::Arc::new(tokio::sync::Mutex::new(QueueState {
                tasks: Vec::new(),
                active: None,
                active_cancel: None,
            })),
            wake: std::sync::Arc::new(tokio::sync::Notify::new()),
            next_id: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(1)),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            event_tx,
            config_provider,
            supervisor: ProcessSupervisor::new(),
        }
    }

    /// Load the current on-disk configuration.
    ///
    /// Always reads the file fresh; this is the same view the scheduler uses
    /// for its next cycle.
    pub async fn current_config(&self) -> crate::config::Config {
        self.config_provider.load().await
    }

    /// Subscribe to task lifecycle events.
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls behind by more than the
    /// channel buffer receives a `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// task processing never depends on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task.
    ///
    /// The server runs concurrently with task processing and listens on the
    /// bind address from the `api` section of the configuration.
    pub fn spawn_api_server(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        tokio::spawn(async move { crate::api::start_api_server(downloader).await })
    }
}
