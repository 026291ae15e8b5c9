//! Addressable configuration keys.
//!
//! Every setting in `config.ini` has a [`ConfigKey`] named `section.key`.
//! Loading and saving go through the same table, so a value accepted by
//! `config set` is exactly a value accepted in the file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigError, ConfigFile};
use crate::package::Locale;

/// A single setting of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    GeneralChannel,
    PathsInstallDir,
    PathsAddOnDir,
    PathsDownloadDir,
    PathsPrefixDir,
    PathsBaseVersionFile,
    AddOnsSelected,
    DownloadTimeoutSecs,
    DownloadVerifyChecksums,
    DownloadKeepArchives,
    MetadataGlobalUrl,
    MetadataCnUrl,
    LoggingFile,
}

const ALL_KEYS: &[ConfigKey] = &[
    ConfigKey::GeneralChannel,
    ConfigKey::PathsInstallDir,
    ConfigKey::PathsAddOnDir,
    ConfigKey::PathsDownloadDir,
    ConfigKey::PathsPrefixDir,
    ConfigKey::PathsBaseVersionFile,
    ConfigKey::AddOnsSelected,
    ConfigKey::DownloadTimeoutSecs,
    ConfigKey::DownloadVerifyChecksums,
    ConfigKey::DownloadKeepArchives,
    ConfigKey::MetadataGlobalUrl,
    ConfigKey::MetadataCnUrl,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        ALL_KEYS
    }

    /// INI section holding the key.
    pub fn section(&self) -> &'static str {
        match self {
            Self::GeneralChannel => "general",
            Self::PathsInstallDir
            | Self::PathsAddOnDir
            | Self::PathsDownloadDir
            | Self::PathsPrefixDir
            | Self::PathsBaseVersionFile => "paths",
            Self::AddOnsSelected => "addons",
            Self::DownloadTimeoutSecs | Self::DownloadVerifyChecksums | Self::DownloadKeepArchives => {
                "download"
            }
            Self::MetadataGlobalUrl | Self::MetadataCnUrl => "metadata",
            Self::LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::GeneralChannel => "channel",
            Self::PathsInstallDir => "install_dir",
            Self::PathsAddOnDir => "add_on_dir",
            Self::PathsDownloadDir => "download_dir",
            Self::PathsPrefixDir => "prefix_dir",
            Self::PathsBaseVersionFile => "base_version_file",
            Self::AddOnsSelected => "selected",
            Self::DownloadTimeoutSecs => "timeout_secs",
            Self::DownloadVerifyChecksums => "verify_checksums",
            Self::DownloadKeepArchives => "keep_archives",
            Self::MetadataGlobalUrl => "global_url",
            Self::MetadataCnUrl => "cn_url",
            Self::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn path(value: &Option<PathBuf>) -> String {
            value
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        }

        match self {
            Self::GeneralChannel => config.general.channel.to_string(),
            Self::PathsInstallDir => path(&config.paths.install_dir),
            Self::PathsAddOnDir => path(&config.paths.add_on_dir),
            Self::PathsDownloadDir => path(&config.paths.download_dir),
            Self::PathsPrefixDir => path(&config.paths.prefix_dir),
            Self::PathsBaseVersionFile => path(&config.paths.base_version_file),
            Self::AddOnsSelected => config
                .add_ons
                .selected
                .iter()
                .map(Locale::code)
                .collect::<Vec<_>>()
                .join(","),
            Self::DownloadTimeoutSecs => config.download.timeout_secs.to_string(),
            Self::DownloadVerifyChecksums => config.download.verify_checksums.to_string(),
            Self::DownloadKeepArchives => config.download.keep_archives.to_string(),
            Self::MetadataGlobalUrl => config.metadata.global_url.clone().unwrap_or_default(),
            Self::MetadataCnUrl => config.metadata.cn_url.clone().unwrap_or_default(),
            Self::LoggingFile => path(&config.logging.file),
        }
    }

    /// Parse `value` and store it.
    ///
    /// An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();

        match self {
            Self::GeneralChannel => {
                config.general.channel = value.parse().map_err(|e| self.invalid(value, e))?;
            }
            Self::PathsInstallDir => config.paths.install_dir = optional_path(value),
            Self::PathsAddOnDir => config.paths.add_on_dir = optional_path(value),
            Self::PathsDownloadDir => config.paths.download_dir = optional_path(value),
            Self::PathsPrefixDir => config.paths.prefix_dir = optional_path(value),
            Self::PathsBaseVersionFile => config.paths.base_version_file = optional_path(value),
            Self::AddOnsSelected => config.add_ons.selected = self.parse_locales(value)?,
            Self::DownloadTimeoutSecs => {
                let secs: u64 = value.parse().map_err(|e| self.invalid(value, e))?;
                if secs == 0 {
                    return Err(self.invalid(value, "must be greater than zero"));
                }
                config.download.timeout_secs = secs;
            }
            Self::DownloadVerifyChecksums => {
                config.download.verify_checksums = self.parse_bool(value)?
            }
            Self::DownloadKeepArchives => config.download.keep_archives = self.parse_bool(value)?,
            Self::MetadataGlobalUrl => config.metadata.global_url = optional_string(value),
            Self::MetadataCnUrl => config.metadata.cn_url = optional_string(value),
            Self::LoggingFile => config.logging.file = optional_path(value),
        }

        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl fmt::Display) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_locales(&self, value: &str) -> Result<Vec<Locale>, ConfigError> {
        let mut locales = Vec::new();
        for tag in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let locale: Locale = tag.parse().map_err(|e| self.invalid(value, e))?;
            if !locales.contains(&locale) {
                locales.push(locale);
            }
        }
        Ok(locales)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    optional_string(value).map(PathBuf::from)
}

fn optional_string(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
