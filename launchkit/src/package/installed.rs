//! Installed add-on package type.
//!
//! An [`InstalledAddOn`] is a derived fact about local state: it is recomputed
//! on every inspection and never cached, since the add-on directory can change
//! between runs (manual deletion, partial downloads).

use std::fmt;

use semver::Version;

use super::locale::Locale;

/// How the version of an installed add-on was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Read from the 3-byte `.version` marker file.
    Marker,
    /// Inferred from the directory footprint.
    Estimated,
}

/// An add-on package found on disk.
///
/// # Example
///
/// ```
/// use semver::Version;
/// use launchkit::package::{InstalledAddOn, Locale, VersionSource};
///
/// let installed = InstalledAddOn::new(Locale::EnUs, Version::new(3, 4, 0), VersionSource::Marker);
///
/// assert_eq!(installed.to_string(), "en-us (3.4.0)");
/// assert!(installed.is_authoritative());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAddOn {
    /// Locale of the add-on.
    pub locale: Locale,
    /// Installed version.
    pub version: Version,
    /// Where `version` came from.
    pub source: VersionSource,
}

impl InstalledAddOn {
    /// Create a new installed add-on record.
    pub fn new(locale: Locale, version: Version, source: VersionSource) -> Self {
        Self {
            locale,
            version,
            source,
        }
    }

    /// Whether the version came from a marker file rather than a guess.
    pub fn is_authoritative(&self) -> bool {
        self.source == VersionSource::Marker
    }
}

impl fmt::Display for InstalledAddOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.locale, self.version)
    }
}

/// Find the installed version of `locale` in an inspection result.
pub fn installed_version(installed: &[InstalledAddOn], locale: Locale) -> Option<&Version> {
    installed
        .iter()
        .find(|a| a.locale == locale)
        .map(|a| &a.version)
}
