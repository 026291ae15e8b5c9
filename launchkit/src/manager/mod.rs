//! Update manager.
//!
//! This module decides what has to be downloaded to bring an install up to
//! date, and provides the default boundaries used to do it.
//!
//! # Components
//!
//! - **resolver**: maps metadata and an installed version to a download target
//! - **estimator**: infers add-on versions from their on-disk footprint
//! - **inspector**: reads installed base and add-on versions
//! - **completion**: decides whether a target is already downloaded
//! - **client**: fetches and caches version metadata ([`MetadataClient`])
//! - **download**: streams archives to disk ([`PackageTransport`])
//! - **extractor**: unpacks archives and applies delete lists
//!
//! # Data Flow
//!
//! ```text
//! MetadataClient ──► resolver ──► DownloadCompletionChecker
//!                       ▲                   │ incomplete
//!                       │                   ▼
//! InstalledStateInspector            PackageTransport ──► ArchiveExtractor
//!        │
//!        └── FootprintVersionEstimator
//! ```
//!
//! Resolution and estimation return values; only the boundaries
//! (metadata, transport, extraction) return [`ManagerError`].

mod client;
mod completion;
mod config;
pub mod download;
mod error;
mod estimator;
mod extractor;
mod inspector;
pub mod resolver;
mod traits;

pub use client::{parse_response, Channel, HttpMetadataClient, UnknownChannel, METADATA_TTL};
pub use completion::DownloadCompletionChecker;
pub use config::{default_add_on_dir, default_base_version_file, ManagerConfig};
pub use error::{ManagerError, ManagerResult};
pub use estimator::{estimate, predict_next, FootprintVersionEstimator, SLACK_MARGIN_BYTES};
pub use extractor::{apply_delete_list, ShellExtractor};
pub use inspector::{directory_size, parse_base_version, InstalledStateInspector};
pub use resolver::{
    add_on_of, resolve, resolve_add_on, resolve_full, versions, AddOnTarget, DownloadTarget,
    ResolveMode, TargetKind, TargetNotFound,
};
pub use traits::{ArchiveExtractor, BoxFuture, MetadataClient, PackageTransport};
