//! Post-archive cleanup of the watched directory.

use crate::fs::walker::walk_directory_with_callback;
use crate::utils::Result;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a purge pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Delete every non-directory entry under `root`, leaving directories in place.
///
/// A file that cannot be removed is logged and skipped. Only a failure of the
/// walk itself is returned as an error.
pub fn purge_files(root: &Path) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();

    walk_directory_with_callback(root, |file_info| {
        match std::fs::remove_file(&file_info.path) {
            Ok(()) => {
                report.deleted += 1;
                info!("Deleted: {}", file_info.path.display());
            }
            Err(e) => {
                report.failed += 1;
                warn!("Failed to delete {}: {}", file_info.path.display(), e);
            }
        }
        Ok(())
    })?;

    Ok(report)
}
