//! Local install inspection.
//!
//! Answers two questions about the install directory:
//! - which base version is installed (from the base version file)
//! - which add-on packages are installed, and at which version
//!
//! # Add-on version lookup
//!
//! ```text
//! <add_on_dir>/<folder>/      missing ──► omitted
//!        │
//!        ├── .version (3 bytes) ──► Marker
//!        │
//!        └── footprint ──► FootprintVersionEstimator ──► Estimated
//!                                        │
//!                                        └── no match ──► omitted
//! ```
//!
//! Absence is never an error. Nothing here is cached: disk state can change
//! between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::bytes::Regex;
use semver::Version;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::estimator::FootprintVersionEstimator;
use crate::package::{
    add_on_folder, parse_version_marker, version_marker_path, InstalledAddOn, Locale,
    VersionSource,
};

/// Version tag embedded in the base version file, e.g. `4.0.0_1234_5678`.
fn base_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([1-9]+\.[0-9]+\.[0-9]+)_\d+_\d+").unwrap())
}

/// Extract the base version from the contents of the base version file.
pub fn parse_base_version(contents: &[u8]) -> Option<Version> {
    let captures = base_version_pattern().captures(contents)?;
    let tag = std::str::from_utf8(captures.get(1)?.as_bytes()).ok()?;
    Version::parse(tag).ok()
}

/// Total size in bytes of all files below `dir`.
///
/// Unreadable entries are skipped.
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Reads installed versions from the install directory.
#[derive(Debug, Clone)]
pub struct InstalledStateInspector {
    add_on_dir: PathBuf,
    base_version_file: PathBuf,
    estimator: FootprintVersionEstimator,
}

impl InstalledStateInspector {
    /// Create an inspector with the built-in size history.
    pub fn new(add_on_dir: PathBuf, base_version_file: PathBuf) -> Self {
        Self {
            add_on_dir,
            base_version_file,
            estimator: FootprintVersionEstimator::default(),
        }
    }

    /// Replace the footprint estimator.
    pub fn with_estimator(mut self, estimator: FootprintVersionEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn add_on_dir(&self) -> &Path {
        &self.add_on_dir
    }

    /// The installed base version, or `None` when it cannot be determined.
    pub async fn current_base_version(&self) -> Option<Version> {
        match tokio::fs::read(&self.base_version_file).await {
            Ok(contents) => {
                let version = parse_base_version(&contents);
                debug!(
                    file = %self.base_version_file.display(),
                    version = ?version.as_ref().map(ToString::to_string),
                    "read base version"
                );
                version
            }
            Err(_) => {
                debug!(file = %self.base_version_file.display(), "no base version file");
                None
            }
        }
    }

    /// Installed add-ons among `locales`, in the order given.
    ///
    /// `latest_known` is the newest released version, used to extend the
    /// size history when it lags behind.
    pub async fn list_installed(
        &self,
        locales: &[Locale],
        latest_known: &Version,
    ) -> Vec<InstalledAddOn> {
        let inspector = self.clone();
        let locales = locales.to_vec();
        let latest_known = latest_known.clone();

        let result = tokio::task::spawn_blocking(move || {
            locales
                .iter()
                .filter_map(|locale| inspector.inspect(*locale, &latest_known))
                .collect::<Vec<_>>()
        })
        .await;

        match result {
            Ok(installed) => installed,
            Err(e) => {
                warn!(error = %e, "add-on inspection task failed");
                Vec::new()
            }
        }
    }

    /// Inspect a single locale on the current thread.
    pub fn inspect(&self, locale: Locale, latest_known: &Version) -> Option<InstalledAddOn> {
        let folder = add_on_folder(&self.add_on_dir, locale);
        if !folder.is_dir() {
            return None;
        }

        let marker = version_marker_path(&self.add_on_dir, locale);
        if let Some(version) = fs::read(&marker).ok().as_deref().and_then(parse_version_marker) {
            debug!(%locale, %version, "add-on version from marker");
            return Some(InstalledAddOn::new(locale, version, VersionSource::Marker));
        }

        let footprint = directory_size(&folder);
        match self.estimator.estimate(locale, footprint, latest_known) {
            Some(version) => {
                debug!(%locale, %version, footprint, "add-on version estimated");
                Some(InstalledAddOn::new(locale, version, VersionSource::Estimated))
            }
            None => {
                debug!(%locale, footprint, "add-on footprint below every known release");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::package::{SizeHistoryEntry, SizeHistoryTable};

    fn small_estimator() -> FootprintVersionEstimator {
        FootprintVersionEstimator::new(SizeHistoryTable::new(vec![
            SizeHistoryEntry::new(Version::new(1, 0, 0), vec![(Locale::EnUs, 1000)]),
            SizeHistoryEntry::new(Version::new(1, 1, 0), vec![(Locale::EnUs, 2000)]),
        ]))
        .with_slack(100)
    }

    #[test]
    fn test_parse_base_version() {
        let contents = b"\x00\x01garbage 4.0.0_12345_67890 more garbage";
        assert_eq!(parse_base_version(contents), Some(Version::new(4, 0, 0)));
        assert_eq!(parse_base_version(b"no version here"), None);
        assert_eq!(parse_base_version(b"4.0.0 without build tags"), None);
    }

    #[test]
    fn test_directory_size() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), vec![0u8; 10]).unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/b"), vec![0u8; 5]).unwrap();

        assert_eq!(directory_size(temp.path()), 15);
        assert_eq!(directory_size(Path::new("/nonexistent/dir")), 0);
    }

    #[tokio::test]
    async fn test_current_base_version() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("globalgamemanagers");
        let inspector = InstalledStateInspector::new(temp.path().to_path_buf(), file.clone());

        assert_eq!(inspector.current_base_version().await, None);

        fs::write(&file, b"....3.9.0_9876543_1234567....").unwrap();
        assert_eq!(
            inspector.current_base_version().await,
            Some(Version::new(3, 9, 0))
        );
    }

    #[tokio::test]
    async fn test_marker_wins_over_footprint() {
        let temp = TempDir::new().unwrap();
        let inspector = InstalledStateInspector::new(
            temp.path().to_path_buf(),
            temp.path().join("ggm"),
        )
        .with_estimator(small_estimator());

        let folder = add_on_folder(temp.path(), Locale::EnUs);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("bank.pck"), vec![0u8; 1950]).unwrap();
        fs::write(folder.join(".version"), [1u8, 0, 3]).unwrap();

        let installed = inspector
            .list_installed(&[Locale::EnUs], &Version::new(1, 1, 0))
            .await;

        assert_eq!(
            installed,
            vec![InstalledAddOn::new(
                Locale::EnUs,
                Version::new(1, 0, 3),
                VersionSource::Marker
            )]
        );
    }

    #[tokio::test]
    async fn test_malformed_marker_falls_back_to_estimate() {
        let temp = TempDir::new().unwrap();
        let inspector = InstalledStateInspector::new(
            temp.path().to_path_buf(),
            temp.path().join("ggm"),
        )
        .with_estimator(small_estimator());

        let folder = add_on_folder(temp.path(), Locale::EnUs);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("bank.pck"), vec![0u8; 1950]).unwrap();
        fs::write(folder.join(".version"), [1u8, 1]).unwrap();

        let installed = inspector
            .list_installed(&[Locale::EnUs], &Version::new(1, 1, 0))
            .await;

        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, Version::new(1, 1, 0));
        assert_eq!(installed[0].source, VersionSource::Estimated);
    }

    #[tokio::test]
    async fn test_missing_and_too_small_are_omitted() {
        let temp = TempDir::new().unwrap();
        let inspector = InstalledStateInspector::new(
            temp.path().to_path_buf(),
            temp.path().join("ggm"),
        )
        .with_estimator(small_estimator());

        // Empty folder: below every footprint
        fs::create_dir_all(add_on_folder(temp.path(), Locale::EnUs)).unwrap();

        let installed = inspector
            .list_installed(&[Locale::EnUs, Locale::JaJp], &Version::new(1, 1, 0))
            .await;

        assert!(installed.is_empty());
    }

    #[tokio::test]
    async fn test_results_follow_requested_order() {
        let temp = TempDir::new().unwrap();
        let inspector = InstalledStateInspector::new(
            temp.path().to_path_buf(),
            temp.path().join("ggm"),
        );

        for locale in [Locale::EnUs, Locale::KoKr] {
            let folder = add_on_folder(temp.path(), locale);
            fs::create_dir_all(&folder).unwrap();
            fs::write(folder.join(".version"), [3u8, 4, 0]).unwrap();
        }

        let installed = inspector
            .list_installed(&[Locale::KoKr, Locale::JaJp, Locale::EnUs], &Version::new(3, 4, 0))
            .await;

        let locales: Vec<_> = installed.iter().map(|a| a.locale).collect();
        assert_eq!(locales, vec![Locale::KoKr, Locale::EnUs]);
    }
}
