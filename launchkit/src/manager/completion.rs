//! Download completion checks.
//!
//! A resolved target is complete when its archive is already in the
//! download directory. Presence alone is not enough: an interrupted transfer
//! leaves a partial file behind, so the archive length must equal the
//! published size exactly, and optionally its MD5 must match. Without a
//! published size only a verified MD5 proves completeness; otherwise the
//! archive is left to the transport, which checks it against the server.
//!
//! The checker never downloads anything.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::download::verify_archive;
use super::error::ManagerError;
use super::resolver::DownloadTarget;
use crate::package::{archive_path, Locale};

/// Decides whether a target's archives are already fully downloaded.
#[derive(Debug, Clone)]
pub struct DownloadCompletionChecker {
    download_dir: PathBuf,
    verify_md5: bool,
}

impl DownloadCompletionChecker {
    /// Create a checker over `download_dir`.
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            verify_md5: false,
        }
    }

    /// Also require a matching MD5 when the descriptor publishes one.
    pub fn with_md5_verification(mut self, verify: bool) -> Self {
        self.verify_md5 = verify;
        self
    }

    /// Whether published digests are checked.
    pub fn verifies_md5(&self) -> bool {
        self.verify_md5
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Whether `target` is already downloaded.
    ///
    /// - `locales == None` checks the base archive.
    /// - `Some(locales)` checks the add-on archive of every listed locale;
    ///   a locale the target does not offer counts as incomplete. An empty
    ///   list is trivially complete.
    pub async fn is_complete(&self, target: &DownloadTarget, locales: Option<&[Locale]>) -> bool {
        match locales {
            None => {
                let package = &target.package;
                self.archive_complete(&package.name, package.size, package.md5.as_deref())
                    .await
            }
            Some(locales) => {
                for locale in locales {
                    let Some(add_on) = target.add_on(*locale) else {
                        debug!(%locale, package = %target.package.name, "add-on not offered");
                        return false;
                    };
                    if !self
                        .archive_complete(&add_on.name, add_on.size, add_on.md5.as_deref())
                        .await
                    {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Check a single archive by name, published size and digest.
    pub async fn archive_complete(
        &self,
        name: &str,
        expected_size: Option<u64>,
        expected_md5: Option<&str>,
    ) -> bool {
        let path = archive_path(&self.download_dir, name);

        let len = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return false,
        };

        let expected_md5 = expected_md5.filter(|_| self.verify_md5);

        match expected_size {
            Some(expected) if len != expected => {
                debug!(archive = name, len, expected, "archive is partial");
                return false;
            }
            None if expected_md5.is_none() => {
                debug!(archive = name, len, "archive size unknown, not trusting it");
                return false;
            }
            _ => {}
        }

        let Some(expected) = expected_md5 else {
            return true;
        };

        match verify_archive(path, expected.to_string()).await {
            Ok(()) => true,
            Err(ManagerError::ChecksumMismatch {
                expected, actual, ..
            }) => {
                warn!(archive = name, %expected, %actual, "archive checksum mismatch");
                false
            }
            Err(e) => {
                warn!(archive = name, error = %e, "failed to checksum archive");
                false
            }
        }
    }
}
