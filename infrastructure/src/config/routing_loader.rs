//! Routing config loader: YAML-or-JSON by file extension,
//! independent of `AppConfig` because its reload semantics are its own —
//! the LLM routing fabric's provider cache re-reads this on demand, and a
//! missing or invalid file must never fail process startup.

use exception_platform_domain::RoutingConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ROUTING_CONFIG_PATH_ENV: &str = "LLM_ROUTING_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum RoutingLoadError {
    #[error("failed to read routing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unrecognized routing config extension for {0}; expected .yaml/.yml/.json")]
    UnknownFormat(PathBuf),
    #[error("failed to parse routing config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Resolves the routing config path: an explicit `path` argument, else
/// the `LLM_ROUTING_CONFIG_PATH` environment variable, else `None` — no
/// routing config configured, every resolution falls through to the
/// `"dummy"` default.
pub fn resolve_routing_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(ROUTING_CONFIG_PATH_ENV).ok().map(PathBuf::from))
}

/// Loads and parses the routing config file at `path`, inferring YAML vs
/// JSON from its extension (`.yaml`/`.yml` → YAML, `.json` → JSON).
pub fn load_routing_config(path: &Path) -> Result<RoutingConfig, RoutingLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RoutingLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&contents).map_err(|e| RoutingLoadError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        }),
        Some("json") => serde_json::from_str(&contents).map_err(|e| RoutingLoadError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        }),
        _ => Err(RoutingLoadError::UnknownFormat(path.to_path_buf())),
    }
}

/// Entry point the LLM routing fabric calls on startup and on reload
///: never fails the caller — an
/// absent or invalid file degrades to `None` ("no routing config", the
/// rest of the precedence chain applies), logging a warning for anything
/// other than a simply-missing file.
pub fn load_routing_config_or_default(explicit: Option<&Path>) -> Option<RoutingConfig> {
    let path = resolve_routing_config_path(explicit)?;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "routing config path set but file does not exist; using defaults");
        return None;
    }
    match load_routing_config(&path) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load routing config; using defaults");
            None
        }
    }
}
