//! Filesystem helpers shared by the table store and the stage probes

use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Backup directory name, created beside each tracked file
pub const BACKUPS_DIR_NAME: &str = ".backups";

/// Check whether a directory exists and contains at least one entry.
///
/// Read failures (permissions, concurrent removal) are logged and read as
/// "no content": a probe failure is evidence of absence, not a fatal
/// condition.
pub fn dir_has_content(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    for entry in WalkDir::new(path).min_depth(1) {
        match entry {
            Ok(_) => return true,
            Err(e) => {
                warn!("Error probing {}: {}", path.display(), e);
                // Continue probing, don't abort
            }
        }
    }
    false
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Replace the contents of `path` atomically.
///
/// Writes to a sibling temporary file, then renames over the target, so a
/// reader never observes a partially written file. The parent directory is
/// created if missing.
pub fn atomic_replace(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Move `path` into its timestamped backup location and return that location.
///
/// The destination is `<parent>/.backups/<stem>-<UTC yyyymmdd_HHMMSS><ext>`;
/// a numeric suffix disambiguates two backups taken within the same second.
pub fn move_to_backup(path: &Path) -> Result<PathBuf> {
    let destination = backup_destination(path);
    ensure_parent(&destination)?;
    std::fs::rename(path, &destination)?;
    debug!(
        "Backed up {} to {}",
        path.display(),
        destination.display()
    );
    Ok(destination)
}

/// Compute the next free timestamped backup path for `path` (nothing is created)
pub fn backup_destination(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let backups = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(BACKUPS_DIR_NAME),
        _ => PathBuf::from(BACKUPS_DIR_NAME),
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = backups.join(format!("{stem}-{stamp}{ext}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = backups.join(format!("{stem}-{stamp}-{n}{ext}"));
        n += 1;
    }
    candidate
}
