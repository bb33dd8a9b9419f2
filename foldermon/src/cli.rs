//! Command-line arguments.

use crate::config::{Config, LogConfig, Targets};
use crate::utils::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to watch for newly created files
    #[arg(value_name = "WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Directory receiving the ZIP bundles (created if missing)
    #[arg(value_name = "BACKUP_DIR")]
    pub backup_dir: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log file (overrides config)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Delete the watched files after each successful archive
    #[arg(long)]
    pub delete_after_archive: bool,

    /// Keep watching when an archive run fails instead of exiting
    #[arg(long)]
    pub continue_on_error: bool,
}

impl Args {
    /// Log settings taken from the flags alone, for reporting a config
    /// file that failed to load
    pub fn flag_log_config(&self) -> LogConfig {
        let mut log = LogConfig::default();
        if let Some(level) = &self.log_level {
            log.level = level.clone();
        }
        if let Some(file) = &self.log_file {
            log.file = file.clone();
        }
        log
    }

    /// Split the arguments into the target directories and the effective
    /// configuration, with flags taking precedence over the config file.
    pub fn resolve(self) -> Result<(Targets, Config)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(file) = self.log_file {
            config.log.file = file;
        }
        if self.delete_after_archive {
            config.monitor.delete_after_archive = true;
        }
        if self.continue_on_error {
            config.monitor.continue_on_error = true;
        }

        let targets = Targets {
            watch_dir: self.watch_dir,
            backup_dir: self.backup_dir,
        };

        Ok((targets, config))
    }
}
