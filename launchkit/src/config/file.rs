//! The `config.ini` file.
//!
//! ```ini
//! [general]
//! channel = global
//!
//! [paths]
//! install_dir = /games/launcher/game
//! prefix_dir = /games/launcher/prefix
//!
//! [addons]
//! selected = en-us,ja-jp
//!
//! [download]
//! timeout_secs = 300
//! verify_checksums = false
//! keep_archives = false
//!
//! [metadata]
//! global_url = https://example.com/resource
//!
//! [logging]
//! file = /home/user/.config/launchkit/launchkit.log
//! ```
//!
//! A missing file means defaults. Values that do not parse are errors.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::keys::ConfigKey;
use crate::manager::{Channel, ManagerConfig};
use crate::package::Locale;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const CONFIG_FILE_NAME: &str = "config.ini";
const LOG_FILE_NAME: &str = "launchkit.log";

/// Errors from loading, saving, or interpreting the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("{0} is not set")]
    Missing(String),
}

/// `[general]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    pub channel: Channel,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            channel: Channel::Global,
        }
    }
}

/// `[paths]`; unset paths follow the install directory layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSettings {
    pub install_dir: Option<PathBuf>,
    pub add_on_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub prefix_dir: Option<PathBuf>,
    pub base_version_file: Option<PathBuf>,
}

/// `[addons]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOnSettings {
    pub selected: Vec<Locale>,
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub timeout_secs: u64,
    pub verify_checksums: bool,
    pub keep_archives: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_checksums: false,
            keep_archives: false,
        }
    }
}

/// `[metadata]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSettings {
    pub global_url: Option<String>,
    pub cn_url: Option<String>,
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub general: GeneralSettings,
    pub paths: PathSettings,
    pub add_ons: AddOnSettings,
    pub download: DownloadSettings,
    pub metadata: MetadataSettings,
    pub logging: LoggingSettings,
}

/// Directory holding the configuration and the default log file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("launchkit")
}

/// Path of `config.ini`.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

impl ConfigFile {
    /// Load the configuration from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load the configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Parse configuration text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                if !value.trim().is_empty() {
                    key.set(&mut config, value)?;
                }
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini
    }

    /// Log file path, configured or default.
    pub fn log_file(&self) -> PathBuf {
        self.logging
            .file
            .clone()
            .unwrap_or_else(|| config_dir().join(LOG_FILE_NAME))
    }

    /// HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.download.timeout_secs)
    }

    /// Build the manager configuration.
    ///
    /// # Errors
    ///
    /// `paths.install_dir` must be set.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        let install_dir = self
            .paths
            .install_dir
            .clone()
            .ok_or_else(|| ConfigError::Missing(ConfigKey::PathsInstallDir.name()))?;

        let mut config = ManagerConfig::new(install_dir)
            .with_channel(self.general.channel)
            .with_timeout(self.timeout())
            .with_verify_checksums(self.download.verify_checksums)
            .with_keep_archives(self.download.keep_archives);

        if let Some(dir) = &self.paths.add_on_dir {
            config = config.with_add_on_dir(dir.clone());
        }
        if let Some(dir) = &self.paths.download_dir {
            config = config.with_download_dir(dir.clone());
        }
        if let Some(file) = &self.paths.base_version_file {
            config = config.with_base_version_file(file.clone());
        }
        if let Some(url) = &self.metadata.global_url {
            config = config.with_metadata_url(Channel::Global, url.clone());
        }
        if let Some(url) = &self.metadata.cn_url {
            config = config.with_metadata_url(Channel::Cn, url.clone());
        }
        for locale in &self.add_ons.selected {
            config = config.with_add_on(*locale);
        }

        Ok(config)
    }
}
