//! Backup run executor - archives the watched directory into one bundle.
//!
//! A run goes through:
//! - Archive: walk the watched directory into a ZIP in the staging directory
//! - Relocate: move the ZIP into the backup directory
//! - Retention: optionally delete the archived originals

pub mod archive;
pub mod retention;

use crate::config::{MonitorConfig, Targets};
use crate::utils::{MonitorError, Result};
use archive::{bundle_file_name, create_bundle};
use chrono::{DateTime, Local};
use retention::purge_files;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Backup run result
#[derive(Debug)]
pub struct BackupResult {
    pub bundle_path: PathBuf,
    pub total_files: usize,
    pub total_bytes: u64,
    pub deleted_files: usize,
    pub duration_ms: u128,
}

/// Runs one archive pass per call
#[derive(Debug, Clone)]
pub struct BackupExecutor {
    targets: Targets,
    staging_dir: Option<PathBuf>,
    delete_after_archive: bool,
}

impl BackupExecutor {
    pub fn new(targets: Targets, config: &MonitorConfig) -> Self {
        Self {
            targets,
            staging_dir: config.staging_dir.clone(),
            delete_after_archive: config.delete_after_archive,
        }
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Directory bundles are written to before being relocated
    pub fn staging_dir(&self) -> &Path {
        self.staging_dir
            .as_deref()
            .unwrap_or(&self.targets.backup_dir)
    }

    /// Create the backup (and staging) directories if they are missing
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.targets.backup_dir)?;
        std::fs::create_dir_all(self.staging_dir())?;
        Ok(())
    }

    /// Execute a backup run named after the current local time
    pub fn execute(&self) -> Result<BackupResult> {
        self.execute_at(Local::now())
    }

    /// Execute a backup run named after `now`
    pub fn execute_at(&self, now: DateTime<Local>) -> Result<BackupResult> {
        let start_time = Instant::now();
        let bundle_name = bundle_file_name(&now);
        let staged_path = self.staging_dir().join(&bundle_name);
        let final_path = self.targets.backup_dir.join(&bundle_name);

        if final_path.exists() || staged_path.exists() {
            warn!(
                "Bundle {} already exists and will be overwritten",
                final_path.display()
            );
        }

        let summary = create_bundle(&self.targets.watch_dir, &staged_path).map_err(|e| {
            error!("Error creating archive {}: {}", staged_path.display(), e);
            e
        })?;

        relocate(&staged_path, &final_path)?;
        info!("Moved archive to: {}", final_path.display());

        let deleted_files = if self.delete_after_archive {
            match purge_files(&self.targets.watch_dir) {
                Ok(report) => {
                    if report.failed > 0 {
                        warn!(
                            "Retention left {} file(s) behind in {}",
                            report.failed,
                            self.targets.watch_dir.display()
                        );
                    }
                    report.deleted
                }
                Err(e) => {
                    error!("Error deleting files: {}", e);
                    0
                }
            }
        } else {
            0
        };

        Ok(BackupResult {
            bundle_path: final_path,
            total_files: summary.entries,
            total_bytes: summary.bytes,
            deleted_files,
            duration_ms: start_time.elapsed().as_millis(),
        })
    }
}

/// Move a finished bundle into place. Identical paths are left untouched.
fn relocate(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        debug!("Archive already in place: {}", to.display());
        return Ok(());
    }

    std::fs::rename(from, to).map_err(|source| {
        error!("Failed to move archive {}: {}", from.display(), source);
        MonitorError::Relocate {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    })
}
