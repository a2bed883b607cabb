//! User-level configuration for waymap
//!
//! Supports loading config from:
//! - `$WAYMAP_CONFIG`, or ~/.config/waymap/config.toml
//! - Environment variables (`WAYMAP_DB`, `WAYMAP_FORMAT`)
//!
//! Command-line flags override both; see `cli::run`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_FORMAT: &str = "text";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// redb database file holding the route graph
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// "text" (default) or "json"
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    pub level: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. Config file
    ///
    /// A config file that can't be parsed is skipped with a warning.
    pub fn load() -> Self {
        let mut config = UserConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            match Self::load_from(&path) {
                Ok(file_config) => {
                    debug!("Loaded config from {}", path.display());
                    config.merge(file_config);
                }
                Err(e) => warn!("Failed to load {}: {:#}", path.display(), e),
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a single TOML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: UserConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the user config file path (`$WAYMAP_CONFIG` wins)
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("WAYMAP_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|p| p.join("waymap").join("config.toml"))
    }

    /// Apply environment overrides through `lookup`
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("WAYMAP_DB").filter(|v| !v.is_empty()) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(format) = lookup("WAYMAP_FORMAT").filter(|v| !v.is_empty()) {
            self.output.format = Some(format);
        }
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.store.path.is_some() {
            self.store.path = other.store.path;
        }
        if other.output.format.is_some() {
            self.output.format = other.output.format;
        }
        if other.log.level.is_some() {
            self.log.level = other.log.level;
        }
    }

    /// Database file to open
    pub fn db_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_db_path)
    }

    pub fn format(&self) -> &str {
        self.output.format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Create the config directory and an example config file
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !config_path.exists() {
            let example = r#"# waymap configuration

[store]
# Database file for the route graph
# path = "/var/lib/waymap/waymap.redb"

[output]
# "text" or "json"
# format = "text"

[log]
# Used when RUST_LOG is not set
# level = "warn"
"#;
            std::fs::write(&config_path, example)?;
        }

        Ok(config_path)
    }
}

/// Default database file: <data dir>/waymap/waymap.redb
pub fn default_db_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| {
        // Fallback to ~/.local/share
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });

    base.join("waymap").join("waymap.redb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = UserConfig::default();
        assert_eq!(config.format(), "text");
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.db_path(), default_db_path());
        assert!(config.db_path().ends_with("waymap/waymap.redb"));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[store]
path = "/tmp/routes.redb"

[output]
format = "json"
"#;
        let config: UserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/tmp/routes.redb"));
        assert_eq!(config.format(), "json");
        // Missing section falls back to defaults
        assert_eq!(config.log_level(), "warn");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: UserConfig = toml::from_str(
            r#"
[store]
path = "from-file.redb"
[output]
format = "text"
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [("WAYMAP_DB", "from-env.redb"), ("WAYMAP_FORMAT", "")]
            .into_iter()
            .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.db_path(), PathBuf::from("from-env.redb"));
        // Empty values are ignored
        assert_eq!(config.format(), "text");
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base = UserConfig::default();
        base.log.level = Some("debug".into());

        let mut other = UserConfig::default();
        other.output.format = Some("json".into());
        base.merge(other);

        assert_eq!(base.log_level(), "debug");
        assert_eq!(base.format(), "json");
    }

    #[test]
    fn test_load_from_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store\npath = 1").unwrap();

        assert!(UserConfig::load_from(&path).is_err());
    }
}
