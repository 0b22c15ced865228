//! Low-level fsync helpers.
//!
//! Renames and marker creations only survive power loss if the containing
//! directory entry is also synced; file fsync alone is not enough on POSIX.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory's entries to disk.
///
/// Must follow every create, rename or delete inside the directory that has
/// to survive a crash.
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    let handle = OpenOptions::new().read(true).open(dir)?;
    handle.sync_all()
}
