//! Configuration for the update manager.

use std::path::PathBuf;
use std::time::Duration;

use super::client::Channel;
use crate::package::Locale;

/// Configuration for the update manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory the base package is installed into.
    pub install_dir: PathBuf,

    /// Directory holding one folder per installed add-on package.
    pub add_on_dir: PathBuf,

    /// Directory downloaded archives are stored in.
    ///
    /// Predownloaded archives stay here until the release unpacks them.
    pub download_dir: PathBuf,

    /// File the installed base version is read from.
    pub base_version_file: PathBuf,

    /// Distribution channel metadata is fetched for.
    pub channel: Channel,

    /// Versions endpoint for the global channel.
    pub global_url: Option<String>,

    /// Versions endpoint for the cn channel.
    pub cn_url: Option<String>,

    /// Add-on locales to keep up to date, in download order.
    pub add_ons: Vec<Locale>,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Whether completed archives must also match their published MD5.
    pub verify_checksums: bool,

    /// Whether to keep downloaded archives after unpacking.
    pub keep_archives: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let install_dir = PathBuf::from(".");
        Self {
            add_on_dir: default_add_on_dir(&install_dir),
            download_dir: std::env::temp_dir().join("launchkit-downloads"),
            base_version_file: default_base_version_file(&install_dir),
            install_dir,
            channel: Channel::Global,
            global_url: None,
            cn_url: None,
            add_ons: Vec::new(),
            timeout: Duration::from_secs(300),
            verify_checksums: false,
            keep_archives: false,
        }
    }
}

/// Data directory below an install directory.
const DATA_DIR: &str = "Game_Data";

/// Add-on folder layout below an install directory.
pub fn default_add_on_dir(install_dir: &std::path::Path) -> PathBuf {
    install_dir
        .join(DATA_DIR)
        .join("StreamingAssets")
        .join("AudioAssets")
}

/// Base version file below an install directory.
pub fn default_base_version_file(install_dir: &std::path::Path) -> PathBuf {
    install_dir.join(DATA_DIR).join("globalgamemanagers")
}

impl ManagerConfig {
    /// Create a new configuration for the given install directory.
    ///
    /// The add-on directory and base version file follow the install
    /// directory's standard layout.
    pub fn new(install_dir: PathBuf) -> Self {
        Self {
            add_on_dir: default_add_on_dir(&install_dir),
            base_version_file: default_base_version_file(&install_dir),
            install_dir,
            ..Default::default()
        }
    }

    /// Set the add-on directory.
    pub fn with_add_on_dir(mut self, path: PathBuf) -> Self {
        self.add_on_dir = path;
        self
    }

    /// Set the download directory.
    pub fn with_download_dir(mut self, path: PathBuf) -> Self {
        self.download_dir = path;
        self
    }

    /// Set the base version file.
    pub fn with_base_version_file(mut self, path: PathBuf) -> Self {
        self.base_version_file = path;
        self
    }

    /// Select the distribution channel.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Set the versions endpoint for a channel.
    pub fn with_metadata_url(mut self, channel: Channel, url: impl Into<String>) -> Self {
        match channel {
            Channel::Global => self.global_url = Some(url.into()),
            Channel::Cn => self.cn_url = Some(url.into()),
        }
        self
    }

    /// Add an add-on locale to the selection.
    pub fn with_add_on(mut self, locale: Locale) -> Self {
        if !self.add_ons.contains(&locale) {
            self.add_ons.push(locale);
        }
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable checksum verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Enable or disable keeping downloaded archives.
    pub fn with_keep_archives(mut self, keep: bool) -> Self {
        self.keep_archives = keep;
        self
    }

    /// Versions endpoint of the selected channel.
    pub fn metadata_url(&self) -> Option<&str> {
        match self.channel {
            Channel::Global => self.global_url.as_deref(),
            Channel::Cn => self.cn_url.as_deref(),
        }
    }
}
