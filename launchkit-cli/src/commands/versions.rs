//! Versions command - list what the version server publishes.

use launchkit::config::format_size;
use launchkit::manager::versions;
use launchkit::package::GameChannel;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the versions command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let config = runner.manager_config()?;
    let orchestrator = runner.orchestrator(&config)?;

    let metadata = runner.block_on(orchestrator.metadata_client().fetch())?;

    println!("Channel: {}", config.channel);
    println!();
    print_channel("Released", &metadata.game);

    let upgradable: Vec<_> = versions(&metadata).into_iter().skip(1).collect();
    if upgradable.is_empty() {
        println!("  No diffs published");
    } else {
        println!("  Diffs from: {}", upgradable.join(", "));
    }

    println!();
    match &metadata.pre_download_game {
        Some(pre) => print_channel("Pre-download", pre),
        None => println!("Pre-download: none published"),
    }

    Ok(())
}

fn print_channel(label: &str, channel: &GameChannel) {
    let latest = &channel.latest;
    println!("{}: {}", label, latest.version);
    println!(
        "  Full package: {} ({})",
        latest.name,
        latest.size.map(format_size).unwrap_or_else(|| "size unknown".to_string())
    );
    for add_on in &latest.add_ons {
        println!(
            "    {:<6} {} ({})",
            add_on.language,
            add_on.name,
            add_on.size.map(format_size).unwrap_or_else(|| "size unknown".to_string())
        );
    }
}
