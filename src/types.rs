//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use utoipa::ToSchema;

/// Maximum number of output lines retained per task (oldest dropped first)
pub const LOG_CAP: usize = 500;

/// Number of terminal tasks surfaced in queue snapshots
pub const SNAPSHOT_TERMINAL_LIMIT: usize = 20;

/// Unique identifier for a download task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for i64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Queued and waiting to start
    Queued,
    /// Currently running in the external downloader
    Downloading,
    /// Successfully completed
    Completed,
    /// Failed with error
    Failed,
    /// Skipped because the history already records this download
    Skipped,
    /// Cancelled by the user
    Cancelled,
}

impl Status {
    /// Whether this status is terminal (never re-entered once set)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Completed | Status::Failed | Status::Skipped | Status::Cancelled
        )
    }
}

/// Options for a download request
///
/// All fields are optional; the wire format mirrors the JSON accepted by the
/// REST API (camelCase keys). Options are immutable once a task is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadOptions {
    /// Explicit downloader format selector (e.g. "bestvideo+bestaudio/best")
    pub format: Option<String>,

    /// Output filename or output template, relative to the chosen location
    pub filename: Option<String>,

    /// Name of the configured location to download into (first location if unset)
    pub location_name: Option<String>,

    /// Treat the URL as a playlist and download all entries
    pub is_playlist: bool,

    /// Extract audio only
    pub audio_only: bool,

    /// Audio container to extract into when `audio_only` is set (e.g. "mp3")
    pub audio_format: Option<String>,

    /// Cap video height (e.g. 1080); ignored when `audio_only` is set
    pub max_resolution: Option<u32>,

    /// Embed metadata into the output file
    pub embed_metadata: bool,

    /// Embed the thumbnail into the output file
    pub embed_thumbnail: bool,

    /// Re-download even if the history already records this (url, format) pair
    pub force: bool,

    /// Also queue a secondary audio-only copy of a video download.
    ///
    /// Honored by the request layer: it enqueues a clone of the task with
    /// `audio_only` set and this flag cleared. Ignored when the primary
    /// request is already audio-only.
    pub also_download_audio: bool,

    /// Request came from the advanced form (informational only)
    pub advanced: bool,
}

/// One requested download and its lifecycle state
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Unique task identifier, never reused
    pub id: TaskId,

    /// Source URL, immutable after creation
    pub url: String,

    /// Request options, immutable after creation
    pub options: DownloadOptions,

    /// Current lifecycle status
    pub status: Status,

    /// Percentage string ("42.3%") or human phrase ("Already downloaded")
    pub progress: String,

    /// Error description, present only when `status == Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Recent downloader output lines, capped at [`LOG_CAP`]
    pub logs: VecDeque<String>,
}

impl Task {
    /// Create a new task in `Queued` state
    pub fn new(id: TaskId, url: String, options: DownloadOptions) -> Self {
        Self {
            id,
            url,
            options,
            status: Status::Queued,
            progress: "0%".to_string(),
            error: None,
            logs: VecDeque::new(),
        }
    }

    /// Append an output line, dropping the oldest line once the cap is reached
    pub fn push_log(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}

/// Read-only view of the queue returned by snapshot operations
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueSnapshot {
    /// The task currently bound to a running downloader process, if any
    pub active: Option<Task>,

    /// Tasks still waiting to start, in submission order
    pub pending: Vec<Task>,

    /// The last [`SNAPSHOT_TERMINAL_LIMIT`] tasks that ended in
    /// `Completed`, `Failed` or `Skipped`, oldest first.
    ///
    /// Cancelled tasks are not surfaced here. They vanish from `pending`
    /// when cancelled and never reappear in this bucket; `clear_completed`
    /// still removes them. Kept for wire compatibility.
    pub completed: Vec<Task>,
}

/// Durable record of one successfully completed download
///
/// The history file is the sole source of truth for de-duplication and
/// survives process restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Source URL
    pub url: String,

    /// Format key summarizing the quality/track choice (see format key rules)
    pub format: String,

    /// Completion time
    pub timestamp: DateTime<Utc>,
}

/// Event emitted during task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task added to the queue
    Queued {
        /// Task ID
        id: TaskId,
        /// Source URL
        url: String,
    },

    /// Task handed to the external downloader
    Started {
        /// Task ID
        id: TaskId,
    },

    /// Progress update parsed from downloader output
    Progress {
        /// Task ID
        id: TaskId,
        /// Progress percentage string, e.g. "42.3%"
        progress: String,
    },

    /// Task completed successfully
    Completed {
        /// Task ID
        id: TaskId,
    },

    /// Task skipped because the history already records it
    Skipped {
        /// Task ID
        id: TaskId,
    },

    /// Task failed
    Failed {
        /// Task ID
        id: TaskId,
        /// Error description
        error: String,
    },

    /// Task cancelled by the user
    Cancelled {
        /// Task ID
        id: TaskId,
    },

    /// Task removed from the queue
    Removed {
        /// Task ID
        id: TaskId,
    },

    /// Downloader is shutting down
    Shutdown,
}
