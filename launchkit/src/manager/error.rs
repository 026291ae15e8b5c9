//! Error types for the update manager.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::resolver::TargetNotFound;
use crate::package::MetadataInvariantError;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors that can occur while fetching metadata, transferring or unpacking
/// packages, or preparing the runtime environment.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The version server could not be reached or answered with a non-success status.
    #[error("version server at {url} is unreachable: {reason}")]
    MetadataFetchFailed { url: String, reason: String },

    /// The version server answered, but reported an application-level error.
    #[error("version server at {url} responded with an error: [{retcode}] {message}")]
    MetadataRejected {
        url: String,
        retcode: i64,
        message: String,
    },

    /// The version server response could not be decoded.
    #[error("failed to parse version metadata from {url}: {reason}")]
    MetadataParseFailed { url: String, reason: String },

    /// The version metadata violates a document invariant.
    #[error("invalid version metadata from {url}: {source}")]
    InvalidMetadata {
        url: String,
        source: MetadataInvariantError,
    },

    /// A download target required by the current operation does not exist.
    #[error("no download target: {0}")]
    TargetNotFound(TargetNotFound),

    /// Failed to download a package archive.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Checksum verification failed.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Archive extraction failed.
    #[error("failed to extract {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// The runtime environment could not be prepared.
    #[error("failed to prepare {name}: {reason}")]
    PrerequisiteFailed { name: String, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<TargetNotFound> for ManagerError {
    fn from(e: TargetNotFound) -> Self {
        ManagerError::TargetNotFound(e)
    }
}
