//! Seams between the update pipeline and the outside world.
//!
//! The resolver, estimator and orchestrator only talk to metadata, transfer
//! and extraction through these traits, so tests can substitute in-memory
//! implementations.
//!
//! Async methods return [`BoxFuture`] to keep the traits dyn-compatible.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use super::download::{DownloadStream, TransferRequest};
use super::error::ManagerResult;
use crate::package::VersionMetadata;

/// A boxed, sendable future borrowing from `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of version metadata for one distribution channel.
pub trait MetadataClient: Send + Sync {
    /// Fetch the current metadata, from cache while it is fresh.
    fn fetch(&self) -> BoxFuture<'_, ManagerResult<Arc<VersionMetadata>>>;

    /// Drop any cached document so the next fetch hits the server.
    fn invalidate(&self) -> BoxFuture<'_, ()>;
}

/// Opens download streams for package archives.
pub trait PackageTransport: Send + Sync {
    /// Start transferring `request.url` into `request.destination_dir`.
    ///
    /// The returned stream yields the transfer's lifecycle events; the
    /// transfer itself runs in the background.
    fn open(&self, request: TransferRequest) -> BoxFuture<'_, ManagerResult<DownloadStream>>;
}

/// Unpacks package archives.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest_dir`, returning the number of entries written.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> ManagerResult<usize>;
}
