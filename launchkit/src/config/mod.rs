//! Configuration file handling.
//!
//! Settings live in `config.ini` under the platform configuration
//! directory (see [`config_file_path`]). The file is optional; every
//! setting has a default except the install directory, which commands that
//! touch an install require.

mod file;
mod keys;
mod size;

pub use file::{
    config_dir, config_file_path, AddOnSettings, ConfigError, ConfigFile, DownloadSettings,
    GeneralSettings, LoggingSettings, MetadataSettings, PathSettings, DEFAULT_TIMEOUT_SECS,
};
pub use keys::ConfigKey;
pub use size::format_size;
