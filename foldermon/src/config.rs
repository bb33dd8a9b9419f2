//! Configuration management for the folder monitor.
//!
//! Loads optional settings from a TOML file; the watch and backup
//! directories always come from the command line.

use crate::utils::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fixed wait after a creation event, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How to decide the new file has finished being written
    #[serde(default)]
    pub settle: SettleMode,

    /// Polling interval for `SettleMode::StableSize`
    #[serde(default = "default_stable_poll_ms")]
    pub stable_poll_ms: u64,

    /// Upper bound on the wait for `SettleMode::StableSize`
    #[serde(default = "default_stable_max_wait_ms")]
    pub stable_max_wait_ms: u64,

    /// Delete archived originals after a successful run
    #[serde(default)]
    pub delete_after_archive: bool,

    /// Log archive failures and keep watching instead of exiting
    #[serde(default)]
    pub continue_on_error: bool,

    /// Directory the bundle is built in before being moved into the backup
    /// directory (defaults to the backup directory itself)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Sleep for `debounce_ms` unconditionally
    #[default]
    Fixed,
    /// Poll the created file until its size stops changing
    StableSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append-only log file, mirrored with stdout
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

/// The two directories the monitor operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    /// Directory observed for new files
    pub watch_dir: PathBuf,

    /// Directory receiving archive bundles
    pub backup_dir: PathBuf,
}

// Default values
fn default_debounce_ms() -> u64 {
    1000
}

fn default_stable_poll_ms() -> u64 {
    250
}

fn default_stable_max_wait_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("foldermon.log")
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            settle: SettleMode::default(),
            stable_poll_ms: default_stable_poll_ms(),
            stable_max_wait_ms: default_stable_max_wait_ms(),
            delete_after_archive: false,
            continue_on_error: false,
            staging_dir: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl MonitorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stable_poll(&self) -> Duration {
        Duration::from_millis(self.stable_poll_ms)
    }

    pub fn stable_max_wait(&self) -> Duration {
        Duration::from_millis(self.stable_max_wait_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| MonitorError::Config(format!("{}: {}", path.display(), e)))
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.debounce(), Duration::from_secs(1));
        assert_eq!(config.monitor.settle, SettleMode::Fixed);
        assert!(!config.monitor.delete_after_archive);
        assert!(!config.monitor.continue_on_error);
        assert!(config.monitor.staging_dir.is_none());
        assert_eq!(config.log.file, PathBuf::from("foldermon.log"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.monitor.debounce_ms, 1000);
        assert_eq!(config.monitor.stable_poll_ms, 250);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            [monitor]
            settle = "stable_size"
            delete_after_archive = true
            staging_dir = "/tmp/staging"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.settle, SettleMode::StableSize);
        assert!(config.monitor.delete_after_archive);
        assert_eq!(config.monitor.staging_dir, Some(PathBuf::from("/tmp/staging")));
        assert_eq!(config.monitor.debounce_ms, 1000);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, PathBuf::from("foldermon.log"));
    }

    #[test]
    fn test_from_file_reports_path_on_parse_error() -> std::io::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("foldermon.toml");
        std::fs::write(&path, "[monitor]\ndebounce_ms = \"soon\"\n")?;

        match Config::from_file(&path) {
            Err(MonitorError::Config(msg)) => assert!(msg.contains("foldermon.toml")),
            other => panic!("expected config error, got {:?}", other),
        }
        Ok(())
    }
}
