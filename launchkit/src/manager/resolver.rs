//! Download target resolution.
//!
//! Maps version metadata plus the locally installed version to the concrete
//! archive that has to be fetched. Resolution is a pure function of its
//! inputs, so a resumed run always picks the same archive as the run it
//! resumes.

use std::fmt;

use semver::Version;
use thiserror::Error;

use crate::package::{
    AddOnPackageDescriptor, GameChannel, Locale, PackageDescriptor, VersionMetadata,
};

/// Which part of the metadata a resolution reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    /// Released packages (`game`).
    Latest,
    /// Not-yet-released packages (`pre_download_game`).
    PreDownload,
}

impl ResolveMode {
    /// Whether archives resolved in this mode are unpacked after download.
    pub fn unpacks(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::PreDownload => write!(f, "pre-download"),
        }
    }
}

/// Why no download target exists.
///
/// These are expected outcomes, not faults: callers branch on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetNotFound {
    /// The installed version has no diff; a full reinstall is the caller's call.
    #[error("no diff upgrades from version {from}")]
    NoMatchingDiff { from: Version },

    /// No pre-download package is published at the moment.
    #[error("no pre-download package is published")]
    NoPreDownload,

    /// The resolved package does not ship an add-on for the locale.
    #[error("{package} has no add-on for locale {locale}")]
    LocaleNotOffered { locale: Locale, package: String },
}

/// Whether a target is a complete package or an incremental one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Full,
    Diff,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Diff => write!(f, "diff"),
        }
    }
}

/// A resolved base package download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Full package or diff.
    pub kind: TargetKind,
    /// The descriptor to fetch.
    pub package: PackageDescriptor,
    /// Version reached once the target is installed.
    pub target_version: String,
    /// Mode the target was resolved in.
    pub mode: ResolveMode,
}

impl DownloadTarget {
    /// Archive file name.
    pub fn archive_name(&self) -> &str {
        &self.package.name
    }

    /// Add-on packages that accompany this target.
    pub fn add_ons(&self) -> &[AddOnPackageDescriptor] {
        &self.package.add_ons
    }

    /// The add-on for `locale`, if this target ships one.
    pub fn add_on(&self, locale: Locale) -> Option<&AddOnPackageDescriptor> {
        self.package.add_on(locale)
    }
}

/// A resolved add-on download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOnTarget {
    pub locale: Locale,
    /// Whether the add-on comes from the full package or a diff.
    pub kind: TargetKind,
    pub package: AddOnPackageDescriptor,
    /// Version reached once the add-on is installed.
    pub target_version: String,
    pub mode: ResolveMode,
}

fn channel(metadata: &VersionMetadata, mode: ResolveMode) -> Result<&GameChannel, TargetNotFound> {
    match mode {
        ResolveMode::Latest => Ok(&metadata.game),
        ResolveMode::PreDownload => metadata
            .pre_download_game
            .as_ref()
            .ok_or(TargetNotFound::NoPreDownload),
    }
}

/// Resolve the base package target.
///
/// - without an installed version the full package of the selected channel
/// - otherwise the diff upgrading from `current`, or `NoMatchingDiff`
/// - in pre-download mode without pre-download data, `NoPreDownload`
pub fn resolve(
    metadata: &VersionMetadata,
    current: Option<&Version>,
    mode: ResolveMode,
) -> Result<DownloadTarget, TargetNotFound> {
    let channel = channel(metadata, mode)?;
    let target_version = channel.latest.version.clone();

    let Some(current) = current else {
        return Ok(DownloadTarget {
            kind: TargetKind::Full,
            package: channel.latest.clone(),
            target_version,
            mode,
        });
    };

    match channel.find_diff(&current.to_string()) {
        Some(diff) => Ok(DownloadTarget {
            kind: TargetKind::Diff,
            package: diff.clone(),
            target_version,
            mode,
        }),
        None => Err(TargetNotFound::NoMatchingDiff {
            from: current.clone(),
        }),
    }
}

/// Resolve the full package of the selected channel, ignoring diffs.
pub fn resolve_full(
    metadata: &VersionMetadata,
    mode: ResolveMode,
) -> Result<DownloadTarget, TargetNotFound> {
    resolve(metadata, None, mode)
}

/// Resolve the add-on target for `locale`, given that add-on's own
/// installed version.
pub fn resolve_add_on(
    metadata: &VersionMetadata,
    locale: Locale,
    current: Option<&Version>,
    mode: ResolveMode,
) -> Result<AddOnTarget, TargetNotFound> {
    let base = resolve(metadata, current, mode)?;
    add_on_of(&base, locale)
}

/// Pick the add-on for `locale` out of an already resolved base target.
pub fn add_on_of(base: &DownloadTarget, locale: Locale) -> Result<AddOnTarget, TargetNotFound> {
    let package = base
        .add_on(locale)
        .cloned()
        .ok_or_else(|| TargetNotFound::LocaleNotOffered {
            locale,
            package: base.package.name.clone(),
        })?;

    Ok(AddOnTarget {
        locale,
        kind: base.kind,
        package,
        target_version: base.target_version.clone(),
        mode: base.mode,
    })
}

/// The released version followed by every version a diff upgrades from.
pub fn versions(metadata: &VersionMetadata) -> Vec<String> {
    std::iter::once(metadata.game.latest.version.clone())
        .chain(metadata.game.diffs.iter().map(|d| d.version.clone()))
        .collect()
}
