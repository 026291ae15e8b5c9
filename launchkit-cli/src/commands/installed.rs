//! Installed command - show what is on disk.

use launchkit::config::format_size;
use launchkit::manager::{directory_size, InstalledStateInspector};
use launchkit::package::{add_on_folder, Locale, SizeHistoryTable, Version, VersionSource};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the installed command.
///
/// Works offline: estimated add-on versions are bounded by the built-in
/// size history only.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let config = runner.manager_config()?;
    let inspector = InstalledStateInspector::new(
        config.add_on_dir.clone(),
        config.base_version_file.clone(),
    );

    let newest = SizeHistoryTable::builtin()
        .newest()
        .cloned()
        .unwrap_or_else(|| Version::new(0, 0, 0));

    let (base, add_ons) = runner.block_on(async {
        let base = inspector.current_base_version().await;
        let add_ons = inspector.list_installed(&Locale::ALL, &newest).await;
        (base, add_ons)
    });

    println!("Install: {}", config.install_dir.display());
    match base {
        Some(version) => println!("Game:    {}", version),
        None => println!("Game:    not installed"),
    }
    println!();

    if add_ons.is_empty() {
        println!("No voice packs installed.");
        return Ok(());
    }

    println!("Voice packs:");
    for add_on in &add_ons {
        let footprint = directory_size(&add_on_folder(&config.add_on_dir, add_on.locale));
        let source = match add_on.source {
            VersionSource::Marker => "",
            VersionSource::Estimated => " (estimated)",
        };
        println!(
            "  {:<14} {}{}  {}",
            add_on.locale.display_name(),
            add_on.version,
            source,
            format_size(footprint)
        );
    }

    Ok(())
}
