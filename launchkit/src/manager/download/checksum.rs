//! MD5 digests of downloaded archives.
//!
//! The version server publishes a lowercase hex MD5 per archive, though some
//! mirrors send it upper case, so digests compare case-insensitively.
//! Archives run to tens of gigabytes; hashing happens on the blocking pool.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::manager::error::{ManagerError, ManagerResult};

const READ_BUFFER: usize = 1024 * 1024;

/// Hex MD5 of the file at `path`.
pub fn file_md5(path: &Path) -> ManagerResult<String> {
    let read_failed = |source| ManagerError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_failed)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER, file);
    let mut hasher = Md5::new();
    io::copy(&mut reader, &mut hasher).map_err(read_failed)?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check the archive at `path` against a published digest.
///
/// A mismatch is [`ManagerError::ChecksumMismatch`] naming the archive.
pub fn verify_checksum(path: &Path, expected: &str) -> ManagerResult<()> {
    let actual = file_md5(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    Err(ManagerError::ChecksumMismatch {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        expected: expected.to_string(),
        actual,
    })
}

/// [`verify_checksum`] on the blocking pool.
pub async fn verify_archive(path: PathBuf, expected: String) -> ManagerResult<()> {
    let checked = path.clone();
    tokio::task::spawn_blocking(move || verify_checksum(&checked, &expected))
        .await
        .map_err(|e| ManagerError::ReadFailed {
            path,
            source: io::Error::other(e),
        })?
}
