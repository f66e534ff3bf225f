//! Ambient application configuration: log level, audit sink path, and
//! the default dry-run posture for tool invocation. Loaded via
//! `figment`, layered the same way the figment-based config loader in
//! this codebase's lineage layers its sources — built-in defaults lowest,
//! an explicit `--config` path highest.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    pub log_level: String,
    pub audit_log_path: PathBuf,
    pub dry_run_tools: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            audit_log_path: PathBuf::from("audit.jsonl"),
            dry_run_tools: true,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Priority (highest to lowest): explicit `config_path` argument →
    /// project `./exception-platform.toml` → XDG global
    /// `<config_dir>/exception-platform/config.toml` →
    /// `EXCEPTION_PLATFORM_*` environment variables → built-in defaults.
    ///
    /// Figment's `merge` gives later sources precedence, so sources are
    /// merged lowest-priority first: defaults, then env, then global,
    /// then project, then the explicit path last.
    pub fn load(config_path: Option<&Path>) -> Result<AppConfig, figment::Error> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Env::prefixed("EXCEPTION_PLATFORM_"));

        if let Some(global) = Self::global_config_path() {
            if global.exists() {
                figment = figment.merge(Toml::file(&global));
            }
        }

        let project = PathBuf::from("exception-platform.toml");
        if project.exists() {
            figment = figment.merge(Toml::file(&project));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("exception-platform").join("config.toml"))
    }
}
