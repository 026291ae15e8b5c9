//! Locale tags for add-on (voice) packages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A locale for which the server distributes an add-on package.
///
/// Locales are identified on the wire by their lowercase tag (`en-us`) and on
/// disk by a folder name inside the add-on directory (`English(US)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "ja-jp")]
    JaJp,
    #[serde(rename = "ko-kr")]
    KoKr,
    #[serde(rename = "zh-cn")]
    ZhCn,
}

impl Locale {
    /// Every known locale, in the order the server lists them.
    pub const ALL: [Locale; 4] = [Locale::ZhCn, Locale::EnUs, Locale::JaJp, Locale::KoKr];

    /// Wire tag, e.g. `en-us`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EnUs => "en-us",
            Self::JaJp => "ja-jp",
            Self::KoKr => "ko-kr",
            Self::ZhCn => "zh-cn",
        }
    }

    /// Name of the folder the add-on unpacks into.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::EnUs => "English(US)",
            Self::JaJp => "Japanese",
            Self::KoKr => "Korean",
            Self::ZhCn => "Chinese",
        }
    }

    /// Human-readable language name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EnUs => "English (US)",
            Self::JaJp => "Japanese",
            Self::KoKr => "Korean",
            Self::ZhCn => "Chinese",
        }
    }

    /// Look up a locale by its on-disk folder name.
    pub fn from_folder_name(folder: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.folder_name() == folder)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown locale tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown locale: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.code() == normalized)
            .ok_or_else(|| UnknownLocale(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse() {
        assert_eq!("en-us".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!(" JA-JP ".parse::<Locale>().unwrap(), Locale::JaJp);
        assert!("fr-fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_locale_folder_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_folder_name(locale.folder_name()), Some(locale));
        }
        assert_eq!(Locale::from_folder_name("French"), None);
    }

    #[test]
    fn test_locale_serde_uses_wire_tag() {
        let json = serde_json::to_string(&Locale::ZhCn).unwrap();
        assert_eq!(json, "\"zh-cn\"");

        let parsed: Locale = serde_json::from_str("\"ko-kr\"").unwrap();
        assert_eq!(parsed, Locale::KoKr);
    }

    #[test]
    fn test_locale_display() {
        assert_eq!(Locale::EnUs.to_string(), "en-us");
    }
}
