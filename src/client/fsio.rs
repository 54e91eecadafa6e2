//! Settings-file IO primitives.
//!
//! - Restrictive permissions (0600): the settings directory holds key
//!   material.
//! - Crash-safe writes via the write-temp, fsync, atomic-rename pattern.
//!
//! This module reads and writes raw bytes; formats and encryption belong to
//! the layers above.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum FsIoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path has no parent directory")]
    NoParentDir,
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, FsIoError> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), FsIoError> {
    let dir = path.parent().ok_or(FsIoError::NoParentDir)?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.as_file_mut().write_all(bytes)?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(0o600))?;

    tmp.persist(path).map_err(|e| FsIoError::Io(e.error))?;
    Ok(())
}
