//! Status command - installed versions and what an update would fetch.

use launchkit::config::format_size;
use launchkit::manager::{
    resolve, DownloadTarget, ManagerConfig, ResolveMode, TargetNotFound,
};
use launchkit::orchestrator::UpdateOrchestrator;
use launchkit::package::{installed_version, Version, VersionMetadata};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the status command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let config = runner.manager_config()?;
    let orchestrator = runner.orchestrator(&config)?;

    runner.block_on(print_status(&config, &orchestrator))
}

async fn print_status(
    config: &ManagerConfig,
    orchestrator: &UpdateOrchestrator,
) -> Result<(), CliError> {
    let metadata = orchestrator.metadata_client().fetch().await?;
    let inspector = orchestrator.inspector();

    let base = inspector.current_base_version().await;
    let latest_known = Version::parse(metadata.latest_version()).ok();
    let add_ons = match &latest_known {
        Some(latest) => inspector.list_installed(&config.add_ons, latest).await,
        None => Vec::new(),
    };

    println!("Channel:  {}", config.channel);
    println!("Install:  {}", config.install_dir.display());
    println!(
        "Game:     {}",
        base.as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "not installed".to_string())
    );
    for locale in &config.add_ons {
        let version = installed_version(&add_ons, *locale)
            .map(ToString::to_string)
            .unwrap_or_else(|| "not installed".to_string());
        println!("  {:<14} {}", locale.display_name(), version);
    }
    println!();

    for mode in [ResolveMode::Latest, ResolveMode::PreDownload] {
        print_resolution(config, orchestrator, &metadata, base.as_ref(), mode).await;
    }

    Ok(())
}

async fn print_resolution(
    config: &ManagerConfig,
    orchestrator: &UpdateOrchestrator,
    metadata: &VersionMetadata,
    base: Option<&Version>,
    mode: ResolveMode,
) {
    let label = match mode {
        ResolveMode::Latest => "Update",
        ResolveMode::PreDownload => "Pre-download",
    };

    let target = match resolve(metadata, base, mode) {
        Ok(target) => target,
        Err(TargetNotFound::NoPreDownload) => {
            println!("{}: none published", label);
            return;
        }
        Err(e) => {
            println!("{}: {}", label, e);
            return;
        }
    };

    if base.is_some_and(|v| v.to_string() == target.target_version) {
        println!("{}: up to date ({})", label, target.target_version);
        return;
    }

    let checker = orchestrator.completion_checker();
    let base_done = checker.is_complete(&target, None).await;
    let add_ons_done = checker.is_complete(&target, Some(config.add_ons.as_slice())).await;

    println!(
        "{}: {} via {} {} ({}){}",
        label,
        target.target_version,
        target.kind,
        target.archive_name(),
        size_of(&target),
        if base_done { ", downloaded" } else { "" }
    );
    if !config.add_ons.is_empty() {
        println!(
            "  Voice packs: {}",
            if add_ons_done { "downloaded" } else { "pending" }
        );
    }
}

fn size_of(target: &DownloadTarget) -> String {
    target
        .package
        .size
        .map(format_size)
        .unwrap_or_else(|| "size unknown".to_string())
}
