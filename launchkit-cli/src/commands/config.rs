//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`.

use std::path::Path;

use clap::Subcommand;
use launchkit::config::{ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., addons.selected)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., addons.selected)
        key: String,

        /// Value to set; empty clears optional settings
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key, path),
        ConfigCommands::Set { key, value } => run_set(&key, &value, path),
        ConfigCommands::List => run_list(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'launchkit config list' to see available keys.",
            key
        ))
    })
}

fn run_get(key: &str, path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn run_set(key: &str, value: &str, path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load_from(path)?;
    config_key.set(&mut config, value)?;
    config.save_to(path)?;

    println!("Set {} = {}", config_key, config_key.get(&config));

    Ok(())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_set_persists_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run(
            ConfigCommands::Set {
                key: "addons.selected".to_string(),
                value: "ja-jp,en-us".to_string(),
            },
            &path,
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(ConfigKey::AddOnsSelected.get(&config), "ja-jp,en-us");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        let result = run(
            ConfigCommands::Get {
                key: "download.parallel".to_string(),
            },
            &temp.path().join("config.ini"),
        );
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_value_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let result = run(
            ConfigCommands::Set {
                key: "download.timeout_secs".to_string(),
                value: "soon".to_string(),
            },
            &path,
        );

        assert!(matches!(result, Err(CliError::ConfigFile(_))));
        assert!(!path.exists());
    }
}
