//! Path existence checks and directory creation.
//!
//! Deliberately tolerant: a failed metadata call means "not there" rather
//! than an error, so callers can treat stale or unreadable paths as absent.

use std::path::Path;

use tracing::warn;

/// Check whether a filesystem entry exists at `path`.
///
/// An empty path never exists. Only existence is checked, not whether the
/// entry is still a runnable executable.
pub fn is_exists_path(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    path.exists()
}

/// Check whether `path` exists and is a directory.
pub fn is_exists_dir(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_dir(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "directory check failed");
            false
        },
    }
}

/// Create `path` and all missing parents. No-op if it already exists.
pub fn mkdir(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if is_exists_dir(path) {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}
