//! Reference table of observed add-on package footprints.
//!
//! Curated by hand: when a new release ships, its unpacked add-on sizes are
//! appended here. Entries are never edited or removed.

use semver::Version;

use super::locale::Locale;

/// Unpacked add-on sizes in bytes, newest release first.
const ADD_ON_SIZES: &[((u64, u64, u64), [(Locale, u64); 4])] = &[
    (
        (3, 4, 0),
        [
            (Locale::EnUs, 9_702_104_595),
            (Locale::JaJp, 10_879_201_351),
            (Locale::KoKr, 8_329_592_851),
            (Locale::ZhCn, 8_498_622_343),
        ],
    ),
    (
        (3, 3, 0),
        [
            (Locale::EnUs, 9_183_929_971),
            (Locale::JaJp, 10_250_403_911),
            (Locale::KoKr, 7_896_362_859),
            (Locale::ZhCn, 8_047_012_675),
        ],
    ),
    (
        (3, 2, 0),
        [
            (Locale::EnUs, 8_636_001_252),
            (Locale::JaJp, 9_600_770_928),
            (Locale::KoKr, 7_416_414_724),
            (Locale::ZhCn, 7_563_358_032),
        ],
    ),
];

/// Observed footprints of one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeHistoryEntry {
    pub version: Version,
    pub sizes: Vec<(Locale, u64)>,
}

impl SizeHistoryEntry {
    pub fn new(version: Version, sizes: Vec<(Locale, u64)>) -> Self {
        Self { version, sizes }
    }

    /// Footprint of `locale` in this release, if recorded.
    pub fn size_of(&self, locale: Locale) -> Option<u64> {
        self.sizes
            .iter()
            .find(|(l, _)| *l == locale)
            .map(|(_, size)| *size)
    }
}

/// Version → locale → byte size, ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeHistoryTable {
    entries: Vec<SizeHistoryEntry>,
}

impl SizeHistoryTable {
    /// Build a table from arbitrary entries; they are sorted newest first.
    pub fn new(mut entries: Vec<SizeHistoryEntry>) -> Self {
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        Self { entries }
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        let entries = ADD_ON_SIZES
            .iter()
            .map(|((major, minor, patch), sizes)| {
                SizeHistoryEntry::new(Version::new(*major, *minor, *patch), sizes.to_vec())
            })
            .collect();
        Self::new(entries)
    }

    /// Append a newer release.
    pub fn with_entry(mut self, entry: SizeHistoryEntry) -> Self {
        self.entries.push(entry);
        Self::new(self.entries)
    }

    pub fn entries(&self) -> &[SizeHistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest recorded release.
    pub fn newest(&self) -> Option<&Version> {
        self.entries.first().map(|e| &e.version)
    }

    /// Footprints recorded for `locale`, newest first.
    pub fn series(&self, locale: Locale) -> Vec<(Version, u64)> {
        self.entries
            .iter()
            .filter_map(|e| e.size_of(locale).map(|size| (e.version.clone(), size)))
            .collect()
    }
}
