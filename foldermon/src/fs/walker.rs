//! Directory traversal for archive and retention runs.
//!
//! Walks are recursive, sorted by file name, and never follow symlinks into
//! directories. Only non-directory entries are reported.

use crate::utils::Result;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// For symlinks, resolves to the target to get the real file size.
    /// Returns None if the symlink target is a directory or cannot be resolved.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let size = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => resolved.len(),
                // Broken symlink
                Err(_) => return Ok(None),
            }
        } else {
            raw_metadata.len()
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
        }))
    }
}

/// Walk a directory tree, calling `callback` for each file in lexical order.
///
/// The first error, from the walk itself or returned by the callback, stops
/// the walk and is returned.
pub fn walk_directory_with_callback<F>(root: &Path, mut callback: F) -> Result<()>
where
    F: FnMut(&FileInfo) -> Result<()>,
{
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            callback(&file_info)?;
        }
    }

    Ok(())
}
