//! Utility functions for easegit
//!
//! Small filesystem and time helpers shared by the hook installer, the
//! configuration store and checkpoint capture.

use crate::error::Result;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::trace;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    // Only the read-only attribute maps onto Windows
    let is_readonly = (mode & 0o200) == 0;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(is_readonly);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Write file atomically
///
/// The content goes to a temporary file in the destination directory, which
/// is then renamed over `path`. Readers see either the old file or the
/// complete new one, never a partial write.
///
/// # Errors
///
/// - [`crate::error::EaseGitError::Io`] if the temporary file cannot be
///   written or the rename fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    trace!("Atomically wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}
