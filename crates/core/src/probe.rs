//! Filesystem probes used to classify entries and compare sides.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::models::{PathType, SyncEntry};

/// Stat `path`, mapping "does not exist" to `None`.
pub async fn metadata(path: &Path) -> Result<Option<Metadata>, SyncError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SyncError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Decide whether `entry` is a file or a directory.
///
/// The local side wins if it exists, then the repo side. When neither exists
/// the local path's spelling decides: a trailing separator means directory,
/// a `.` in the last segment means file, and anything else is assumed to be
/// a directory.
pub async fn resolve_path_type(entry: &SyncEntry) -> Result<PathType, SyncError> {
    for path in [&entry.local_path, &entry.repo_path] {
        if let Some(meta) = metadata(path).await? {
            let kind = if meta.is_dir() { PathType::Dir } else { PathType::File };
            debug!(entry = %entry.name, path = %path.display(), %kind, "classified from filesystem");
            return Ok(kind);
        }
    }

    if let Some(kind) = guess_path_type(&entry.local_path) {
        debug!(entry = %entry.name, %kind, "classified from path spelling");
        return Ok(kind);
    }

    warn!(entry = %entry.name, "cannot determine path type; assuming directory");
    Ok(PathType::Dir)
}

/// Spelling-based guess for a path that exists on neither side.
pub fn guess_path_type(path: &Path) -> Option<PathType> {
    let raw = path.as_os_str().to_string_lossy();
    if raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR) {
        return Some(PathType::Dir);
    }
    match path.file_name() {
        Some(name) if name.to_string_lossy().contains('.') => Some(PathType::File),
        _ => None,
    }
}
