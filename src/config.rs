//! Configuration loading for the search pipeline.
//!
//! All tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so the pipeline can still run against a local store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    /// Base URL of the document store's HTTP command endpoint.
    #[serde(default = "default_store_endpoint")]
    pub store_endpoint: String,
    /// Directory where remote EPUBs are materialized before parsing.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: default_log_level(),
            store_endpoint: default_store_endpoint(),
            cache_dir: default_cache_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// Load configuration from `path`, falling back to defaults when the file is
/// absent or does not parse.
pub fn load_config(path: &Path) -> AppConfig {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => {
            info!(path = %path.display(), "No config file, using defaults");
            return AppConfig::default();
        }
    };
    match toml::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), "Ignoring unparseable config: {err}");
            AppConfig::default()
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_store_endpoint() -> String {
    "http://127.0.0.1:10041".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache/remote-epubs")
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_store_timeout_secs() -> u64 {
    10
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: AppConfig = toml::from_str("store_endpoint = \"http://db:10041\"")
            .expect("partial config should parse");
        assert_eq!(config.store_endpoint, "http://db:10041");
        assert_eq!(config.cache_dir, PathBuf::from(".cache/remote-epubs"));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.fetch_timeout_secs, 30);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.store_endpoint, default_store_endpoint());
    }

    #[test]
    fn unparseable_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "store_endpoint = [not toml").expect("temp file should be writable");
        let config = load_config(file.path());
        assert_eq!(config.store_endpoint, default_store_endpoint());
    }

    #[test]
    fn log_level_round_trips_through_toml() {
        let config: AppConfig =
            toml::from_str("log_level = \"warn\"").expect("log level should parse");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_level.as_filter_str(), "warn");
    }
}
