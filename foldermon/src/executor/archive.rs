//! ZIP bundle creation.
//!
//! A bundle holds one entry per regular file under the watched directory,
//! keyed by its forward-slash path relative to that directory. Directories
//! are implied by entry names and never stored on their own.

use crate::fs::walker::walk_directory_with_callback;
use crate::utils::Result;
use chrono::{DateTime, TimeZone};
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Component, Path};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension used for every bundle
pub const BUNDLE_EXTENSION: &str = "zip";

/// Totals for one finished bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub bytes: u64,
}

/// Bundle file name for a run started at `now`, e.g. `backup_20250102_030405.zip`.
///
/// Resolution is one second; two runs within the same second get the same name.
pub fn bundle_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("backup_{}.{}", now.format("%Y%m%d_%H%M%S"), BUNDLE_EXTENSION)
}

/// Archive entry name for a path relative to the watch root.
///
/// UTF-8 components are used as they are. A component that is not valid
/// UTF-8 has its invalid bytes and any `%` written as `%XX`, so distinct
/// file names map to distinct entries.
pub fn entry_name(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(component_name(part)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn component_name(part: &OsStr) -> String {
    match part.to_str() {
        Some(name) => name.to_string(),
        None => escape_non_utf8(part),
    }
}

#[cfg(unix)]
fn escape_non_utf8(part: &OsStr) -> String {
    use std::fmt::Write;
    use std::os::unix::ffi::OsStrExt;

    let mut out = String::new();
    let mut rest = part.as_bytes();

    while !rest.is_empty() {
        let (valid, invalid_len) = match std::str::from_utf8(rest) {
            Ok(valid) => (valid, 0),
            Err(e) => {
                let valid = std::str::from_utf8(&rest[..e.valid_up_to()]).unwrap_or_default();
                let invalid_len = e.error_len().unwrap_or(rest.len() - e.valid_up_to());
                (valid, invalid_len)
            }
        };

        for ch in valid.chars() {
            match ch {
                '%' => out.push_str("%25"),
                _ => out.push(ch),
            }
        }

        let invalid_start = valid.len();
        for byte in &rest[invalid_start..invalid_start + invalid_len] {
            let _ = write!(out, "%{:02X}", byte);
        }
        rest = &rest[invalid_start + invalid_len..];
    }

    out
}

#[cfg(not(unix))]
fn escape_non_utf8(part: &OsStr) -> String {
    part.to_string_lossy().into_owned()
}

/// Write every file under `source` into a new ZIP at `bundle_path`.
///
/// An existing file at `bundle_path` is truncated. On error the partially
/// written bundle is left where it is.
pub fn create_bundle(source: &Path, bundle_path: &Path) -> Result<ArchiveSummary> {
    let file = File::create(bundle_path)?;
    info!("Archive path: {}", bundle_path.display());

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = ArchiveSummary::default();

    walk_directory_with_callback(source, |file_info| {
        let name = entry_name(&file_info.relative_path);
        if file_info.relative_path.to_str().is_none() {
            warn!(
                "Non UTF-8 file name {}, stored as {}",
                file_info.path.display(),
                name
            );
        }
        let entry_options = options.large_file(file_info.size >= u64::from(u32::MAX));

        zip.start_file(name.as_str(), entry_options)?;
        let mut input = File::open(&file_info.path)?;
        let copied = io::copy(&mut input, &mut zip)?;

        summary.entries += 1;
        summary.bytes += copied;
        info!("Added to archive: {}", file_info.path.display());
        Ok(())
    })?;

    let file = zip.finish()?;
    file.sync_all()?;

    debug!(
        "Finalized {} ({} entries, {} bytes)",
        bundle_path.display(),
        summary.entries,
        summary.bytes
    );

    Ok(summary)
}
