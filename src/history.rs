//! Durable download history used for de-duplication.
//!
//! The history is a single JSON array of [`HistoryEntry`] records, rewritten
//! in full on each append. History size is bounded by user activity, so the
//! read-append-rewrite cycle stays cheap in practice. A store is constructed
//! per scheduling cycle from the freshly loaded config, so `history_path`
//! changes take effect without a restart.

use crate::error::Result;
use crate::types::HistoryEntry;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Append-only persisted record of completed downloads
#[derive(Clone, Debug)]
pub struct HistoryStore {
    history_path: PathBuf,
}

impl HistoryStore {
    /// Create a store backed by the given file path
    pub fn new(history_path: impl Into<PathBuf>) -> Self {
        Self {
            history_path: history_path.into(),
        }
    }

    /// Path of the history document this store reads and writes
    pub fn path(&self) -> &Path {
        &self.history_path
    }

    /// Whether a completed download is already recorded for `(url, format_key)`
    pub async fn contains(&self, url: &str, format_key: &str) -> bool {
        self.read_entries()
            .await
            .iter()
            .any(|entry| entry.url == url && entry.format == format_key)
    }

    /// All recorded entries, oldest first
    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.read_entries().await
    }

    /// Record a completed download.
    ///
    /// Reads the current document, appends the new entry and rewrites the
    /// file. Exactly one entry is appended per completed task; failed,
    /// skipped and cancelled tasks never reach this method.
    pub async fn append(&self, url: &str, format_key: &str) -> Result<()> {
        let mut entries = self.read_entries().await;
        entries.push(HistoryEntry {
            url: url.to_string(),
            format: format_key.to_string(),
            timestamp: Utc::now(),
        });

        let data = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.history_path, data).await?;
        Ok(())
    }

    /// Read the full history document, recovering from corruption.
    ///
    /// A missing or empty file is an empty history. A present-but-unparsable
    /// file is renamed to a timestamped backup so the corruption leaves a
    /// trace without blocking future lookups or appends.
    async fn read_entries(&self) -> Vec<HistoryEntry> {
        let data = match tokio::fs::read_to_string(&self.history_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(
                    path = %self.history_path.display(),
                    error = %e,
                    "Failed to read history file"
                );
                return Vec::new();
            }
        };

        if data.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<HistoryEntry>>(&data) {
            Ok(entries) => entries,
            Err(e) => {
                self.backup_corrupted(&e).await;
                Vec::new()
            }
        }
    }

    /// Move an unparsable history file aside to `<path>.bak.<millis>`
    async fn backup_corrupted(&self, parse_error: &serde_json::Error) {
        let backup_path = PathBuf::from(format!(
            "{}.bak.{}",
            self.history_path.display(),
            Utc::now().timestamp_millis()
        ));
        tracing::error!(
            path = %self.history_path.display(),
            backup = %backup_path.display(),
            error = %parse_error,
            "History file is corrupt, moving to backup and starting empty"
        );
        if let Err(e) = tokio::fs::rename(&self.history_path, &backup_path).await {
            tracing::error!(
                path = %self.history_path.display(),
                error = %e,
                "Failed to move corrupt history file to backup"
            );
        }
    }
}
