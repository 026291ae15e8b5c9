//! Archive transport.
//!
//! This module provides:
//! - Streaming downloads with resume support (`http`)
//! - Transfer lifecycle events (`progress`)
//! - MD5 checksum verification (`checksum`)
//!
//! # Architecture
//!
//! ```text
//! PackageTransport (trait)
//!         │
//!         └── HttpTransport ──► ArchiveExtractor (unless skip_unpack)
//!                 │
//!                 ▼
//!         DownloadStream
//!             ├── events: Start → Progress* → Finish
//!             └── finish(): bytes transferred or error
//! ```
//!
//! # Example
//!
//! ```ignore
//! use launchkit::manager::download::{DownloadEvent, HttpTransport, TransferRequest};
//! use launchkit::manager::PackageTransport;
//!
//! let transport = HttpTransport::new()?;
//! let request = TransferRequest::new(url, "game_4.0.0.zip", download_dir).skip_unpack();
//!
//! let mut stream = transport.open(request).await?;
//! while let Some(event) = stream.next_event().await {
//!     if let DownloadEvent::Progress { done, total, .. } = event {
//!         println!("{} / {}", done, total);
//!     }
//! }
//! let bytes = stream.finish().await?;
//! ```

mod checksum;
mod http;
mod progress;

use std::path::PathBuf;

pub use checksum::{file_md5, verify_archive, verify_checksum};
pub use http::HttpTransport;
pub use progress::{DownloadEvent, DownloadStream, EventEmitter};

/// What to fetch and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source URI.
    pub url: String,
    /// File name of the archive inside `destination_dir`.
    pub file_name: String,
    /// Directory the archive is written to.
    pub destination_dir: PathBuf,
    /// Size published for the archive, preferred over the server's header.
    pub expected_size: Option<u64>,
    /// MD5 the archive must match, when verification is wanted.
    pub expected_md5: Option<String>,
    /// Only fetch the raw archive (predownload).
    pub skip_unpack: bool,
    /// Directory the archive is unpacked into.
    pub unpack_dir: PathBuf,
}

impl TransferRequest {
    /// Request `url` into `destination_dir/file_name`, unpacking next to it.
    pub fn new(url: impl Into<String>, file_name: impl Into<String>, destination_dir: PathBuf) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
            unpack_dir: destination_dir.clone(),
            destination_dir,
            expected_size: None,
            expected_md5: None,
            skip_unpack: false,
        }
    }

    /// Set the published archive size.
    pub fn with_expected_size(mut self, size: Option<u64>) -> Self {
        self.expected_size = size;
        self
    }

    /// Require the archive to match `md5`.
    pub fn with_expected_md5(mut self, md5: Option<String>) -> Self {
        self.expected_md5 = md5;
        self
    }

    /// Set the directory the archive is unpacked into.
    pub fn with_unpack_dir(mut self, dir: PathBuf) -> Self {
        self.unpack_dir = dir;
        self
    }

    /// Fetch the raw archive only.
    pub fn skip_unpack(mut self) -> Self {
        self.skip_unpack = true;
        self
    }

    /// Full path of the downloaded archive.
    pub fn destination(&self) -> PathBuf {
        self.destination_dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_builder() {
        let request = TransferRequest::new("https://cdn/game.zip", "game.zip", PathBuf::from("/dl"))
            .with_expected_size(Some(42))
            .with_expected_md5(Some("5eb63bbbe01eeed093cb22bb8f5acdc3".to_string()))
            .with_unpack_dir(PathBuf::from("/game"))
            .skip_unpack();

        assert_eq!(request.destination(), PathBuf::from("/dl/game.zip"));
        assert_eq!(request.expected_size, Some(42));
        assert_eq!(
            request.expected_md5.as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(request.unpack_dir, PathBuf::from("/game"));
        assert!(request.skip_unpack);
    }

    #[test]
    fn test_transfer_request_unpacks_in_place_by_default() {
        let request = TransferRequest::new("https://cdn/a.zip", "a.zip", PathBuf::from("/dl"));
        assert_eq!(request.unpack_dir, PathBuf::from("/dl"));
        assert!(!request.skip_unpack);
        assert!(request.expected_md5.is_none());
    }
}
