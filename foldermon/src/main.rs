//! Folder Monitor - Main entry point
//!
//! Usage: `foldermon [OPTIONS] <WATCH_DIR> <BACKUP_DIR>`

use anyhow::Result;
use clap::Parser;
use foldermon::config::LogConfig;
use foldermon::{cli::Args, daemon, utils};
use std::fmt::Display;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            log_startup_error(&LogConfig::default(), &e);
            std::process::exit(e.exit_code());
        }
    };

    let flag_log = args.flag_log_config();
    let (targets, config) = match args.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            log_startup_error(&flag_log, &e);
            return Err(e.into());
        }
    };

    // Kept alive until exit so buffered log lines reach the file
    let _log_guard = utils::logger::init(&config.log.level, &config.log.file)?;

    tracing::info!(
        "Starting folder monitor v{} (log file: {})",
        env!("CARGO_PKG_VERSION"),
        config.log.file.display()
    );

    if let Err(e) = daemon::run(targets, config).await {
        tracing::error!("Folder monitor stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Record an error raised before the configuration is known
fn log_startup_error(log: &LogConfig, error: &dyn Display) {
    match utils::logger::init(&log.level, &log.file) {
        Ok(guard) => {
            tracing::error!("{}", error);
            drop(guard);
        }
        Err(e) => {
            eprintln!("{}", error);
            eprintln!("Failed to open log file {}: {}", log.file.display(), e);
        }
    }
}
