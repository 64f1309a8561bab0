//! Shared test helpers for creating MediaDownloader instances in tests.
//!
//! Tests run against a throwaway shell script standing in for the real
//! downloader binary, so they exercise the full spawn/stream/reap path
//! without touching the network.

use crate::config::ConfigProvider;
use crate::downloader::MediaDownloader;
use std::path::{Path, PathBuf};

/// Exits 0 after printing two progress lines
#[cfg(unix)]
pub(crate) const QUICK_SUCCESS: &str = "#!/bin/sh\n\
echo '[download]  42.3% of 10.00MiB'\n\
echo '[download] 100% of 10.00MiB'\n\
exit 0\n";

/// Exits 1 with a line on stderr
#[cfg(unix)]
pub(crate) const ALWAYS_FAIL: &str = "#!/bin/sh\n\
echo 'ERROR: unsupported url' >&2\n\
exit 1\n";

/// Never exits on its own; used by cancellation tests
#[cfg(unix)]
pub(crate) const HANG: &str = "#!/bin/sh\n\
echo '[download]   1.0% of 10.00MiB'\n\
exec sleep 30\n";

/// Write an executable fake downloader script into `dir`
#[cfg(unix)]
pub(crate) fn write_fake_downloader(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Build a downloader whose config points at the given fake binary script.
///
/// Returns the downloader and the tempdir backing its config, history file
/// and download location. The tempdir must be kept alive for the duration of
/// the test.
#[cfg(unix)]
pub(crate) async fn create_test_downloader_with(
    script: &str,
) -> (MediaDownloader, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_fake_downloader(dir.path(), "fake-dl", script);
    let download_dir = dir.path().join("downloads");
    std::fs::create_dir_all(&download_dir).unwrap();

    let config = serde_json::json!({
        "downloader_path": binary,
        "allowed_locations": [
            { "name": "default", "path": download_dir }
        ],
        "history_path": dir.path().join("history.json"),
    });
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();

    let downloader = MediaDownloader::new(ConfigProvider::new(&config_path)).await;
    (downloader, dir)
}

/// Downloader backed by a fake binary that succeeds immediately
#[cfg(unix)]
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    create_test_downloader_with(QUICK_SUCCESS).await
}

/// Downloader with no scheduler running, for pure queue-operation tests.
///
/// The config file does not exist, so defaults apply; nothing is ever
/// executed because the scheduler is never started.
pub(crate) async fn create_idle_downloader() -> (MediaDownloader, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let downloader =
        MediaDownloader::new(ConfigProvider::new(dir.path().join("missing-config.json"))).await;
    (downloader, dir)
}
