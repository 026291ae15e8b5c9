//! Version metadata documents published by the version server.
//!
//! The server answers with an envelope (`retcode`, `message`, `data`) whose
//! `data` field describes one distribution channel: the latest full package,
//! incremental diffs from older versions, and optionally a pre-release
//! ("pre-download") package of the same shape.

use std::collections::HashSet;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};

use super::locale::Locale;
use super::naming::is_plain_file_name;

/// Envelope returned by the version server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerResponse {
    /// Application-level status code (`0` on success).
    pub retcode: i64,
    /// Application-level status message (`"OK"` on success).
    pub message: String,
    /// Payload, absent when the server reports an error.
    #[serde(default)]
    pub data: Option<VersionMetadata>,
}

impl ServerResponse {
    /// Whether the server reported success.
    pub fn is_ok(&self) -> bool {
        self.message == "OK"
    }
}

/// Immutable snapshot of the server state for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Currently released packages.
    pub game: GameChannel,
    /// Not-yet-released packages, published ahead of a release.
    #[serde(default)]
    pub pre_download_game: Option<GameChannel>,
}

/// A full package plus the diffs that upgrade older installs to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameChannel {
    /// Full package; `latest.version` is the version it installs.
    pub latest: PackageDescriptor,
    /// Incremental packages; each `version` is the version it upgrades from.
    #[serde(default)]
    pub diffs: Vec<PackageDescriptor>,
}

/// A downloadable base package (full or diff).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Archive file name.
    pub name: String,
    /// Installed version for a full package, source version for a diff.
    pub version: String,
    /// Download URI.
    pub path: String,
    /// MD5 of the archive, when published.
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub md5: Option<String>,
    /// Archive size in bytes.
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub size: Option<u64>,
    /// Unpacked size in bytes.
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub package_size: Option<u64>,
    /// Locale add-on packages matching this base package.
    #[serde(default, rename = "voice_packs")]
    pub add_ons: Vec<AddOnPackageDescriptor>,
}

impl PackageDescriptor {
    /// Find the add-on package for a locale.
    pub fn add_on(&self, locale: Locale) -> Option<&AddOnPackageDescriptor> {
        self.add_ons.iter().find(|a| a.language == locale.code())
    }
}

/// A downloadable locale add-on package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnPackageDescriptor {
    /// Locale tag as sent by the server (e.g. `en-us`).
    pub language: String,
    /// Archive file name.
    pub name: String,
    /// Download URI.
    pub path: String,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub md5: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub package_size: Option<u64>,
}

impl AddOnPackageDescriptor {
    /// Parsed locale, if the tag is one we know.
    pub fn locale(&self) -> Option<Locale> {
        self.language.parse().ok()
    }
}

/// Violation of a metadata document invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataInvariantError {
    /// Two diffs in the same channel upgrade from the same version.
    #[error("duplicate diff from version {0}")]
    DuplicateDiff(String),

    /// Two add-ons in the same package share a locale.
    #[error("duplicate add-on for locale {locale} in {package}")]
    DuplicateAddOn { package: String, locale: String },

    /// A version string is not `major.minor.patch`.
    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    /// An archive name is not a plain file name.
    #[error("archive name is not a plain file name: {0}")]
    UnsafeArchiveName(String),

    /// The pre-download package is not newer than the released one.
    #[error("pre-download version {pre_download} is not newer than latest {latest}")]
    PreDownloadNotNewer { latest: String, pre_download: String },
}

impl VersionMetadata {
    /// Version the released full package installs.
    pub fn latest_version(&self) -> &str {
        &self.game.latest.version
    }

    /// Check the document invariants.
    ///
    /// - every version string is `major.minor.patch`
    /// - diff source versions are unique per channel
    /// - add-on locales are unique per package
    /// - archive names are plain file names
    /// - the pre-download package, if any, is strictly newer than `latest`
    pub fn validate(&self) -> Result<(), MetadataInvariantError> {
        self.game.validate()?;

        if let Some(pre) = &self.pre_download_game {
            pre.validate()?;

            let latest = parse_version(&self.game.latest.version)?;
            let pre_version = parse_version(&pre.latest.version)?;
            if pre_version <= latest {
                return Err(MetadataInvariantError::PreDownloadNotNewer {
                    latest: self.game.latest.version.clone(),
                    pre_download: pre.latest.version.clone(),
                });
            }
        }

        Ok(())
    }
}

impl GameChannel {
    /// Find the diff that upgrades from `version`.
    pub fn find_diff(&self, version: &str) -> Option<&PackageDescriptor> {
        self.diffs.iter().find(|d| d.version == version)
    }

    fn validate(&self) -> Result<(), MetadataInvariantError> {
        parse_version(&self.latest.version)?;

        let mut seen = HashSet::new();
        for diff in &self.diffs {
            parse_version(&diff.version)?;
            if !seen.insert(diff.version.as_str()) {
                return Err(MetadataInvariantError::DuplicateDiff(diff.version.clone()));
            }
        }

        for package in std::iter::once(&self.latest).chain(self.diffs.iter()) {
            check_archive_name(&package.name)?;

            let mut locales = HashSet::new();
            for add_on in &package.add_ons {
                check_archive_name(&add_on.name)?;
                if !locales.insert(add_on.language.as_str()) {
                    return Err(MetadataInvariantError::DuplicateAddOn {
                        package: package.name.clone(),
                        locale: add_on.language.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn check_archive_name(name: &str) -> Result<(), MetadataInvariantError> {
    if is_plain_file_name(name) {
        Ok(())
    } else {
        Err(MetadataInvariantError::UnsafeArchiveName(name.to_string()))
    }
}

fn parse_version(s: &str) -> Result<Version, MetadataInvariantError> {
    Version::parse(s).map_err(|_| MetadataInvariantError::InvalidVersion(s.to_string()))
}

/// Sizes arrive either as JSON numbers or as decimal strings; empty strings
/// mean "unknown".
fn deserialize_opt_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Number(u64),
        Text(String),
    }

    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawSize::Number(n)) => Ok(Some(n)),
        Some(RawSize::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawSize::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
