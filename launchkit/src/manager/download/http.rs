//! HTTP transport with resume support.
//!
//! This module provides the default [`PackageTransport`]:
//! - Resumable downloads via HTTP Range requests
//! - Chunked streaming with per-chunk progress events
//! - Unpacking through an [`ArchiveExtractor`] unless the request skips it

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use super::checksum::verify_archive;
use super::progress::{DownloadStream, EventEmitter};
use super::TransferRequest;
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::extractor::ShellExtractor;
use crate::manager::traits::{ArchiveExtractor, BoxFuture, PackageTransport};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// HTTP-based package transport.
///
/// Resumes a partial archive when the server advertises
/// `accept-ranges: bytes`; otherwise restarts it. There is no retry: a
/// failed transfer leaves its partial file for the next run to resume.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    extractor: Arc<dyn ArchiveExtractor>,
    pub(crate) timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport with the default timeout and the shell extractor.
    pub fn new() -> ManagerResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> ManagerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ManagerError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            extractor: Arc::new(ShellExtractor::new()),
            timeout,
        })
    }

    /// Replace the extractor used for unpacking.
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Query file size and range support via HEAD request.
    async fn query_file_info(&self, url: &str) -> ManagerResult<(u64, bool)> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            return Err(ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HEAD request failed with status {}", response.status()),
            });
        }

        let total_size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let supports_range = response
            .headers()
            .get("accept-ranges")
            .map(|v| v.to_str().unwrap_or("") == "bytes")
            .unwrap_or(false);

        Ok((total_size, supports_range))
    }

    /// Run one transfer to completion, reporting through `emitter`.
    ///
    /// Returns the number of bytes fetched by this run.
    async fn transfer(
        &self,
        request: &TransferRequest,
        emitter: &mut EventEmitter,
    ) -> ManagerResult<u64> {
        let url = request.url.as_str();
        let dest = request.destination();

        fs::create_dir_all(&request.destination_dir)
            .await
            .map_err(|e| ManagerError::CreateDirFailed {
                path: request.destination_dir.clone(),
                source: e,
            })?;

        let mut existing_size = match fs::metadata(&dest).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let (reported_size, supports_range) = self.query_file_info(url).await?;
        let total_size = request.expected_size.unwrap_or(reported_size);

        if total_size > 0
            && existing_size == total_size
            && !self.check_existing_download(request, &dest).await?
        {
            existing_size = 0;
        }

        let fetched = if total_size > 0 && existing_size == total_size {
            debug!(file = %request.file_name, "archive already on disk");
            emitter.start(&request.file_name, total_size, existing_size).await;
            0
        } else {
            let resume_from = if existing_size > 0 && supports_range && existing_size < total_size
            {
                existing_size
            } else {
                0
            };
            let fetched = self
                .stream_download(url, &dest, resume_from, total_size, &request.file_name, emitter)
                .await?;
            self.verify_download(request, &dest).await?;
            fetched
        };

        if !request.skip_unpack {
            self.unpack(&dest, &request.unpack_dir).await?;
        }

        emitter.finish().await;
        Ok(fetched)
    }

    /// Check a full-size archive against the requested digest.
    ///
    /// A mismatching archive is removed so the transfer starts over.
    async fn check_existing_download(
        &self,
        request: &TransferRequest,
        dest: &Path,
    ) -> ManagerResult<bool> {
        let Some(expected) = request.expected_md5.clone() else {
            return Ok(true);
        };

        match verify_archive(dest.to_path_buf(), expected).await {
            Ok(()) => Ok(true),
            Err(ManagerError::ChecksumMismatch {
                expected, actual, ..
            }) => {
                warn!(
                    file = %request.file_name,
                    %expected,
                    %actual,
                    "archive checksum mismatch, downloading again"
                );
                fs::remove_file(dest)
                    .await
                    .map_err(|e| ManagerError::WriteFailed {
                        path: dest.to_path_buf(),
                        source: e,
                    })?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Verify a finished download against the requested digest.
    ///
    /// A corrupt archive is removed so the next run fetches it again.
    async fn verify_download(&self, request: &TransferRequest, dest: &Path) -> ManagerResult<()> {
        let Some(expected) = request.expected_md5.clone() else {
            return Ok(());
        };

        let result = verify_archive(dest.to_path_buf(), expected).await;
        if result.is_err() {
            fs::remove_file(dest).await.ok();
        }
        result
    }

    /// Stream the response body into `dest`, appending from `start_byte`.
    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        start_byte: u64,
        total_size: u64,
        file_name: &str,
        emitter: &mut EventEmitter,
    ) -> ManagerResult<u64> {
        let mut request = self.client.get(url);
        if start_byte > 0 {
            request = request.header("Range", format!("bytes={}-", start_byte));
        }

        let mut response = request.send().await.map_err(|e| self.request_error(url, e))?;

        // Check response status (200 OK or 206 Partial Content)
        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        // A server may ignore the Range header and send the whole body
        let start_byte = if start_byte > 0 && status != StatusCode::PARTIAL_CONTENT {
            warn!(url, "server ignored range request, restarting download");
            0
        } else {
            start_byte
        };

        let total_size = if total_size > 0 {
            total_size
        } else {
            response.content_length().unwrap_or(0) + start_byte
        };

        let file = open_destination(dest, start_byte > 0).await?;
        let mut writer = BufWriter::new(file);
        let mut downloaded = start_byte;

        if start_byte > 0 {
            info!(url, resume_from = start_byte, total = total_size, "resuming download");
        } else {
            info!(url, total = total_size, "starting download");
        }
        emitter.start(file_name, total_size, start_byte).await;

        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(url)
            } else {
                ManagerError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("Read error: {}", e),
                }
            }
        })? {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| ManagerError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += chunk.len() as u64;
            emitter.progress(downloaded, total_size).await;
        }

        writer.flush().await.map_err(|e| ManagerError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if total_size > 0 && downloaded != total_size {
            return Err(ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: format!("received {} of {} bytes", downloaded, total_size),
            });
        }

        debug!(url, bytes = downloaded - start_byte, "download complete");
        Ok(downloaded - start_byte)
    }

    /// Unpack `archive` into `dest_dir` on the blocking pool.
    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> ManagerResult<()> {
        let extractor = Arc::clone(&self.extractor);
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest_dir.to_path_buf();

        let count = tokio::task::spawn_blocking(move || extractor.extract(&archive_owned, &dest_owned))
            .await
            .map_err(|e| ManagerError::ExtractionFailed {
                path: archive.to_path_buf(),
                reason: format!("extraction task failed: {}", e),
            })??;

        info!(archive = %archive.display(), files = count, "archive unpacked");
        Ok(())
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> ManagerError {
        if e.is_timeout() {
            self.timeout_error(url)
        } else {
            ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn timeout_error(&self, url: &str) -> ManagerError {
        ManagerError::Timeout {
            url: url.to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

/// Open `dest` for appending, or truncate it for a fresh download.
async fn open_destination(dest: &Path, append: bool) -> ManagerResult<File> {
    let result = if append {
        OpenOptions::new().append(true).open(dest).await
    } else {
        File::create(dest).await
    };

    result.map_err(|e| ManagerError::WriteFailed {
        path: PathBuf::from(dest),
        source: e,
    })
}

impl PackageTransport for HttpTransport {
    fn open(&self, request: TransferRequest) -> BoxFuture<'_, ManagerResult<DownloadStream>> {
        Box::pin(async move {
            let (mut emitter, events) = DownloadStream::channel();
            let transport = self.clone();

            let handle = tokio::spawn(async move {
                let result = transport.transfer(&request, &mut emitter).await;
                if let Err(e) = &result {
                    warn!(url = %request.url, error = %e, "transfer failed");
                }
                result
            });

            Ok(DownloadStream::new(events, handle))
        })
    }
}
