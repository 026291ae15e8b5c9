//! Init command - create or update the configuration file.

use std::path::{Path, PathBuf};

use launchkit::config::ConfigFile;
use launchkit::manager::{default_add_on_dir, Channel};
use launchkit::package::Locale;

use crate::error::CliError;

/// Arguments for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    pub install_dir: Option<PathBuf>,
    pub prefix_dir: Option<PathBuf>,
    pub channel: Option<Channel>,
    pub add_ons: Vec<Locale>,
}

/// Run the init command.
///
/// Existing settings are kept unless given on the command line. Voice packs
/// already present in the install are selected when none are given.
pub fn run(args: InitArgs, path: &Path) -> Result<(), CliError> {
    let mut config = ConfigFile::load_from(path)?;

    if let Some(dir) = args.install_dir {
        config.paths.install_dir = Some(dir);
    }
    if let Some(dir) = args.prefix_dir {
        config.paths.prefix_dir = Some(dir);
    }
    if let Some(channel) = args.channel {
        config.general.channel = channel;
    }

    if !args.add_ons.is_empty() {
        config.add_ons.selected = args.add_ons;
    } else if config.add_ons.selected.is_empty() {
        if let Some(install_dir) = &config.paths.install_dir {
            config.add_ons.selected = detect_add_ons(install_dir);
        }
    }

    config.save_to(path)?;

    println!("Configuration file: {}", path.display());
    match &config.paths.install_dir {
        Some(dir) => println!("Install directory:  {}", dir.display()),
        None => println!("Install directory:  (not set, use --install-dir)"),
    }
    if !config.add_ons.selected.is_empty() {
        let names: Vec<_> = config.add_ons.selected.iter().map(Locale::code).collect();
        println!("Voice packs:        {}", names.join(", "));
    }
    println!();
    println!("Edit this file to customize LaunchKit settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Locales whose add-on folder exists in the install.
fn detect_add_ons(install_dir: &Path) -> Vec<Locale> {
    let add_on_dir = default_add_on_dir(install_dir);
    Locale::ALL
        .into_iter()
        .filter(|locale| add_on_dir.join(locale.folder_name()).is_dir())
        .collect()
}
