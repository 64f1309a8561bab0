//! Configuration types for media-dl
//!
//! The on-disk configuration is a JSON document that operators may edit while
//! the service is running: it is reloaded in full on every scheduling cycle,
//! so changes take effect for the next task, never for one already running.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use utoipa::ToSchema;

/// A named root directory permitted as a download destination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Display name, matched against `DownloadOptions::location_name`
    pub name: String,

    /// Root directory for downloads into this location
    pub path: PathBuf,
}

/// API server settings (used only at startup, not hot-reloaded)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address for the REST API (default: 127.0.0.1:8790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" or empty = any origin)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Serve interactive Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            swagger_ui: false,
        }
    }
}

/// Normalized view of the on-disk configuration document
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Path or bare name of the external downloader binary (default: "yt-dlp")
    #[serde(default = "default_downloader_path")]
    pub downloader_path: String,

    /// Permitted download locations (default: one "Default" entry at "downloads")
    #[serde(default = "default_locations", deserialize_with = "locations_field")]
    pub allowed_locations: Vec<Location>,

    /// Path of the JSON history document (default: "history.json")
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Operator-supplied arguments appended verbatim to every invocation.
    ///
    /// Accepts either a single string (whitespace-split) or a list of strings.
    #[serde(default)]
    pub extra_args: ExtraArgs,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloader_path: default_downloader_path(),
            allowed_locations: default_locations(),
            history_path: default_history_path(),
            extra_args: ExtraArgs::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Extra command-line arguments, as a string or a list
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ExtraArgs {
    /// Whitespace-separated arguments in a single string
    Text(String),
    /// Already-split argument list
    List(Vec<String>),
}

impl Default for ExtraArgs {
    fn default() -> Self {
        ExtraArgs::Text(String::new())
    }
}

impl ExtraArgs {
    /// Flatten into an argument list. String form is split on any run of
    /// whitespace; an empty or blank string yields no arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            ExtraArgs::Text(s) => s.split_whitespace().map(String::from).collect(),
            ExtraArgs::List(v) => v.clone(),
        }
    }
}

fn default_downloader_path() -> String {
    "yt-dlp".to_string()
}

fn default_history_path() -> PathBuf {
    PathBuf::from("history.json")
}

fn default_locations() -> Vec<Location> {
    vec![Location {
        name: "Default".to_string(),
        path: PathBuf::from("downloads"),
    }]
}

fn default_bind_address() -> SocketAddr {
    #[allow(clippy::expect_used)]
    "127.0.0.1:8790"
        .parse()
        .expect("default bind address is valid")
}

fn default_true() -> bool {
    true
}

/// Accept `allowed_locations` as either a list of `{name, path}` objects or a
/// name-keyed map of them. Malformed entries (non-objects, missing or empty
/// `path`) are dropped; a missing `name` falls back to the map key, then to
/// the path string. An
/// empty result is replaced by the default location so the field never
/// normalizes to nothing.
fn locations_field<'de, D>(deserializer: D) -> std::result::Result<Vec<Location>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_locations(value))
}

fn normalize_locations(value: serde_json::Value) -> Vec<Location> {
    // Map keys double as fallback names for their entries
    let entries: Vec<(Option<String>, serde_json::Value)> = match value {
        serde_json::Value::Array(list) => list.into_iter().map(|v| (None, v)).collect(),
        serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
        _ => Vec::new(),
    };

    let mut locations = Vec::new();
    for (key, entry) in entries {
        let Some(obj) = entry.as_object() else {
            tracing::warn!(?entry, "Dropping malformed location entry");
            continue;
        };
        let path = obj
            .get("path")
            .and_then(|p| p.as_str())
            .filter(|p| !p.is_empty());
        let Some(path) = path else {
            tracing::warn!(?obj, "Dropping location entry without a path");
            continue;
        };
        let name = obj
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .map(String::from)
            .or(key)
            .unwrap_or_else(|| path.to_string());
        locations.push(Location {
            name,
            path: PathBuf::from(path),
        });
    }

    if locations.is_empty() {
        tracing::warn!("No usable locations in configuration, substituting default");
        return default_locations();
    }
    locations
}

impl Config {
    /// Resolve the effective location for a task.
    ///
    /// Matches by name when `location_name` is given; an unknown name falls
    /// back to the first configured location (matching the behavior clients
    /// depend on). An empty location list is a hard configuration error.
    pub fn resolve_location(&self, location_name: Option<&str>) -> Result<&Location> {
        if self.allowed_locations.is_empty() {
            return Err(Error::NoLocations);
        }
        if let Some(name) = location_name
            && let Some(found) = self.allowed_locations.iter().find(|l| l.name == name)
        {
            return Ok(found);
        }
        // First configured location is the fallback
        self.allowed_locations.first().ok_or(Error::NoLocations)
    }

    /// Resolve and vet the output directory for a task.
    ///
    /// The effective directory is the location root, extended by any
    /// directory components of a user-supplied filename. After lexical
    /// normalization the result must be a descendant of at least one
    /// configured location root; anything else is rejected before a process
    /// is ever spawned.
    pub fn resolve_output_dir(
        &self,
        location: &Location,
        filename: Option<&str>,
    ) -> Result<PathBuf> {
        let mut candidate = absolutize(&location.path);
        if let Some(filename) = filename
            && let Some(parent) = Path::new(filename).parent()
            && parent != Path::new("")
        {
            candidate = candidate.join(parent);
        }
        let candidate = normalize_path(&candidate);

        let contained = self.allowed_locations.iter().any(|loc| {
            let root = normalize_path(&absolutize(&loc.path));
            candidate.starts_with(&root)
        });
        if !contained {
            return Err(Error::PathOutsideAllowed { path: candidate });
        }

        Ok(normalize_path(&absolutize(&location.path)))
    }
}

/// Make a path absolute against the current working directory, without
/// touching the filesystem.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    }
}

/// Lexical path normalization: resolves `.` and `..` components without
/// consulting the filesystem. `..` at the root is preserved so escape
/// attempts keep failing the containment prefix check.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_with_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if ends_with_normal {
                    normalized.pop();
                } else {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Loads and normalizes the configuration document.
///
/// A provider is constructed once with the config file path; every call to
/// [`ConfigProvider::load`] reads the file fresh, so edits on disk are picked
/// up on the next scheduling cycle without a restart.
#[derive(Clone, Debug)]
pub struct ConfigProvider {
    config_path: PathBuf,
}

impl ConfigProvider {
    /// Create a provider for the given config file path
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Path of the config document this provider reads
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration from disk.
    ///
    /// A missing file is normal (defaults apply silently at debug level); a
    /// present-but-unreadable or unparsable file falls back to defaults with
    /// a warning. Loading never fails the scheduling cycle.
    pub async fn load(&self) -> Config {
        let data = match tokio::fs::read_to_string(&self.config_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                return Config::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                return Config::default();
            }
        };

        match serde_json::from_str::<Config>(&data) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to parse config file, using defaults"
                );
                Config::default()
            }
        }
    }
}
