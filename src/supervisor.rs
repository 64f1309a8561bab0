//! Process supervision for the external downloader binary.
//!
//! The supervisor owns one external process at a time: it builds the argument
//! vector deterministically from the task's options, spawns the binary,
//! streams stdout/stderr line-by-line into a channel for the queue owner to
//! consume, and resolves the run as success, failure or cancellation from the
//! exit code. It never mutates task state itself; that stays with the single
//! queue-owning scheduler.

use crate::config::ExtraArgs;
use crate::error::{Error, Result};
use crate::types::DownloadOptions;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default output template for single downloads
const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Default output template for playlist downloads
const PLAYLIST_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";

/// Number of stderr lines carried into a failure description
const STDERR_TAIL: usize = 5;

#[allow(clippy::expect_used)]
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").expect("progress pattern is valid")
});

/// One line of downloader output, tagged by stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputLine {
    /// A line read from the child's stdout
    Stdout(String),
    /// A line read from the child's stderr
    Stderr(String),
}

/// How a supervised run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Process exited with code 0
    Success,
    /// Process exited nonzero without being cancelled
    Failed {
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Human-readable description including the captured stderr tail
        detail: String,
    },
    /// The run was interrupted via the cancellation token.
    ///
    /// The exit code after an interrupt is deliberately ignored: the caller
    /// has already marked the task cancelled and must not see a failure.
    Cancelled,
}

/// Everything needed to execute one task: the resolved invocation
#[derive(Clone, Debug)]
pub struct RunSpec {
    /// Source URL
    pub url: String,
    /// Request options the argument vector is derived from
    pub options: DownloadOptions,
    /// Vetted output directory (already containment-checked)
    pub output_dir: PathBuf,
    /// Path or bare name of the downloader binary
    pub binary: String,
    /// Operator-supplied extra arguments
    pub extra_args: ExtraArgs,
}

/// Extract a progress percentage from a downloader output line.
///
/// Matches the `[download]  42.3% of ...` lines the tool prints with
/// `--newline`. Returns the percentage as a display string; the caller
/// applies last-match-wins with no smoothing.
pub fn parse_progress(line: &str) -> Option<String> {
    PROGRESS_RE
        .captures(line)
        .map(|caps| format!("{}%", &caps[1]))
}

/// Spawns and supervises the external downloader
#[derive(Clone, Debug, Default)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    /// Create a supervisor
    pub fn new() -> Self {
        Self
    }

    /// Build the argument vector for one invocation.
    ///
    /// Deterministic for a given spec. The output directory is baked into
    /// the `-o` template rather than set as a working directory, so relative
    /// paths never depend on where the service was started.
    pub fn build_args(spec: &RunSpec) -> Vec<String> {
        let options = &spec.options;
        let mut args: Vec<String> = vec![
            spec.url.clone(),
            "--write-info-json".to_string(),
            "--newline".to_string(),
        ];

        args.extend(spec.extra_args.to_args());

        if options.audio_only {
            args.push("--extract-audio".to_string());
            if let Some(audio_format) = &options.audio_format {
                args.push("--audio-format".to_string());
                args.push(audio_format.clone());
            }
        }

        // Format selection. Resolution caps take precedence over an explicit
        // format string; with neither set, best combined video+audio is
        // requested explicitly so audio-only flags hiding in extra_args
        // cannot override it.
        if !options.audio_only {
            if let Some(max_resolution) = options.max_resolution {
                args.push("-f".to_string());
                args.push(format!(
                    "bestvideo[height<=?{}]+bestaudio/best",
                    max_resolution
                ));
            } else if let Some(format) = &options.format {
                args.push("-f".to_string());
                args.push(format.clone());
            } else {
                args.push("-f".to_string());
                args.push("bestvideo+bestaudio/best".to_string());
            }
        } else if let Some(format) = &options.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }

        if options.embed_metadata {
            args.push("--embed-metadata".to_string());
        }
        if options.embed_thumbnail {
            args.push("--embed-thumbnail".to_string());
        }

        let template = if options.is_playlist {
            args.push("--yes-playlist".to_string());
            options.filename.as_deref().unwrap_or(PLAYLIST_TEMPLATE)
        } else {
            args.push("--no-playlist".to_string());
            options.filename.as_deref().unwrap_or(SINGLE_TEMPLATE)
        };
        args.push("-o".to_string());
        args.push(spec.output_dir.join(template).to_string_lossy().into_owned());

        args
    }

    /// Run one download to completion.
    ///
    /// Output lines are streamed into `line_tx` as they arrive; the caller
    /// consumes them concurrently. Cancelling `cancel` delivers an interrupt
    /// to the child (SIGINT on unix) and resolves the run as
    /// [`RunOutcome::Cancelled`] once the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the binary cannot be started. Everything
    /// after a successful spawn is reported through [`RunOutcome`].
    pub async fn run(
        &self,
        spec: &RunSpec,
        cancel: CancellationToken,
        line_tx: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<RunOutcome> {
        let args = Self::build_args(spec);
        tracing::debug!(binary = %spec.binary, ?args, "Spawning downloader");

        let mut child = Command::new(&spec.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn {
                binary: spec.binary.clone(),
                reason: e.to_string(),
            })?;

        let pid = child.id();

        let stdout_task = child.stdout.take().map(|stdout| {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tx.send(OutputLine::Stdout(line)).ok();
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut tail: Vec<String> = Vec::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(line = %line, "downloader stderr");
                    if tail.len() >= STDERR_TAIL {
                        tail.remove(0);
                    }
                    tail.push(line.clone());
                    tx.send(OutputLine::Stderr(line)).ok();
                }
                tail
            })
        });

        let mut cancelled = false;
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                cancelled = true;
                Self::interrupt(&mut child, pid);
                child.wait().await?
            }
        };

        // Readers run until EOF; collect the stderr tail for diagnostics
        if let Some(task) = stdout_task {
            task.await.ok();
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if cancelled {
            tracing::info!(pid = ?pid, "Downloader interrupted by cancellation");
            return Ok(RunOutcome::Cancelled);
        }

        if status.success() {
            return Ok(RunOutcome::Success);
        }

        let exit_code = status.code();
        let mut detail = match exit_code {
            Some(code) => format!("downloader exited with code {}", code),
            None => "downloader terminated by signal".to_string(),
        };
        if !stderr_tail.is_empty() {
            detail.push_str(": ");
            detail.push_str(&stderr_tail.join("; "));
        }
        Ok(RunOutcome::Failed { exit_code, detail })
    }

    /// Deliver an interrupt to the running child.
    ///
    /// SIGINT on unix so the downloader can clean up partial files the way a
    /// Ctrl+C would let it; a hard kill elsewhere.
    #[cfg(unix)]
    fn interrupt(child: &mut tokio::process::Child, pid: Option<u32>) {
        if let Some(pid) = pid {
            // SAFETY: plain kill(2) with a valid pid obtained from the child handle
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGINT);
            }
        } else {
            child.start_kill().ok();
        }
    }

    #[cfg(not(unix))]
    fn interrupt(child: &mut tokio::process::Child, _pid: Option<u32>) {
        child.start_kill().ok();
    }
}
