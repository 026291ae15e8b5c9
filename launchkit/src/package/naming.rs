//! On-disk naming conventions for installed and downloaded packages.

use std::path::{Component, Path, PathBuf};

use semver::Version;

use super::locale::Locale;

/// Marker file holding an add-on's version as three raw bytes.
pub const VERSION_MARKER_FILE: &str = ".version";

/// List of stale files shipped inside update archives.
pub const DELETE_LIST_FILE: &str = "deletefiles.txt";

/// Directory an add-on for `locale` is installed into.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use launchkit::package::{add_on_folder, Locale};
///
/// let dir = add_on_folder(Path::new("/game/audio"), Locale::EnUs);
/// assert_eq!(dir, Path::new("/game/audio/English(US)"));
/// ```
pub fn add_on_folder(add_on_dir: &Path, locale: Locale) -> PathBuf {
    add_on_dir.join(locale.folder_name())
}

/// Path of the version marker for an add-on.
pub fn version_marker_path(add_on_dir: &Path, locale: Locale) -> PathBuf {
    add_on_folder(add_on_dir, locale).join(VERSION_MARKER_FILE)
}

/// Whether a server-supplied archive name is a single plain file name.
///
/// Names with directory separators, `..` or a root would place the archive
/// outside the download directory.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Location a downloaded archive is stored at.
///
/// `archive_name` must pass [`is_plain_file_name`]; metadata validation
/// rejects documents where it does not.
pub fn archive_path(download_dir: &Path, archive_name: &str) -> PathBuf {
    download_dir.join(archive_name)
}

/// Decode a version marker.
///
/// Only a marker of exactly three bytes is well formed; anything else is
/// ignored so that footprint estimation takes over.
pub fn parse_version_marker(bytes: &[u8]) -> Option<Version> {
    match bytes {
        [major, minor, patch] => Some(Version::new(
            u64::from(*major),
            u64::from(*minor),
            u64::from(*patch),
        )),
        _ => None,
    }
}

/// Encode a version marker. Fails for components above 255.
pub fn encode_version_marker(version: &Version) -> Option<[u8; 3]> {
    Some([
        u8::try_from(version.major).ok()?,
        u8::try_from(version.minor).ok()?,
        u8::try_from(version.patch).ok()?,
    ])
}
