//! Package data model.
//!
//! This module provides the types describing what the version server
//! publishes and what is installed locally.
//!
//! # Overview
//!
//! - **VersionMetadata**: server snapshot for one channel (latest full package,
//!   diffs, optional pre-download package)
//! - **PackageDescriptor / AddOnPackageDescriptor**: downloadable archives
//! - **Locale**: add-on package languages and their on-disk folders
//! - **InstalledAddOn**: an add-on found on disk, with its (possibly estimated) version
//! - **SizeHistoryTable**: curated add-on footprints used for version estimation
//!
//! # Type Hierarchy
//!
//! ```text
//! VersionMetadata
//! ├── game: GameChannel
//! │   ├── latest: PackageDescriptor ──► add_ons: [AddOnPackageDescriptor]
//! │   └── diffs:  [PackageDescriptor]
//! └── pre_download_game: Option<GameChannel>
//! ```

mod installed;
mod locale;
mod metadata;
mod naming;
mod size_history;

pub use installed::{installed_version, InstalledAddOn, VersionSource};
pub use locale::{Locale, UnknownLocale};
pub use metadata::{
    AddOnPackageDescriptor, GameChannel, MetadataInvariantError, PackageDescriptor,
    ServerResponse, VersionMetadata,
};
pub use naming::{
    add_on_folder, archive_path, encode_version_marker, is_plain_file_name, parse_version_marker,
    version_marker_path, DELETE_LIST_FILE, VERSION_MARKER_FILE,
};
pub use size_history::{SizeHistoryEntry, SizeHistoryTable};

#[cfg(test)]
pub(crate) use metadata::fixtures;

// Re-export semver::Version for convenience
pub use semver::Version;
