//! Update and predownload commands.

use launchkit::config::format_size;
use launchkit::manager::ResolveMode;
use launchkit::orchestrator::{ArtifactOutcome, MissingDiffPolicy, RunOutcome, RunReport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::progress::{self, EVENT_BUFFER};
use crate::runner::CliRunner;

/// Run the update (`Latest`) or predownload pipeline.
pub fn run(runner: &CliRunner, mode: ResolveMode, full_fallback: bool) -> Result<(), CliError> {
    let config = runner.manager_config()?;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping after the current step...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let policy = if full_fallback {
        MissingDiffPolicy::FullPackage
    } else {
        MissingDiffPolicy::Abort
    };

    let orchestrator = runner
        .orchestrator(&config)?
        .with_missing_diff_policy(policy)
        .with_cancellation(token);

    println!("Install:  {}", config.install_dir.display());
    println!("Channel:  {}", config.channel);
    if !config.add_ons.is_empty() {
        let names: Vec<_> = config.add_ons.iter().map(|l| l.display_name()).collect();
        println!("Voices:   {}", names.join(", "));
    }
    println!();

    let report = runner.block_on(async {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let renderer = tokio::spawn(progress::render(rx));
        let result = orchestrator.run(mode, Some(tx)).await;
        renderer.await.ok();
        result
    })?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();

    if report.outcome == RunOutcome::NothingToDo {
        match report.mode {
            ResolveMode::PreDownload => println!("No pre-download package is available."),
            ResolveMode::Latest => println!("Nothing to do."),
        }
        return;
    }

    if let Some(version) = &report.target_version {
        println!("Target version: {}", version);
    }
    if let Some(base) = report.base {
        println!("  Game:  {}", describe(base));
    }
    for (locale, outcome) in &report.add_ons {
        println!("  {:<6} {}", format!("{}:", locale), describe(*outcome));
    }
    println!();
    println!("Downloaded {}", format_size(report.bytes_transferred));

    if report.mode == ResolveMode::PreDownload && report.outcome == RunOutcome::Completed {
        println!("Pre-download complete. The update installs when it is released.");
    }
}

fn describe(outcome: ArtifactOutcome) -> String {
    match outcome {
        ArtifactOutcome::Transferred { bytes } => format!("downloaded {}", format_size(bytes)),
        other => other.to_string(),
    }
}
