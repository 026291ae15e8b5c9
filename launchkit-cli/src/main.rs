//! LaunchKit CLI - Command-line interface
//!
//! Keeps a game install and its voice packs up to date, and predownloads the
//! next release when the version server publishes it.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use launchkit::manager::ResolveMode;
use launchkit::package::Locale;

use commands::config::ConfigCommands;
use commands::init::InitArgs;
use error::CliError;
use runner::{CliRunner, GlobalArgs};

#[derive(Debug, Parser)]
#[command(name = "launchkit", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update the configuration file
    ///
    /// Stores --install-dir and --channel along with the options below.
    Init {
        /// Wine prefix directory
        #[arg(long, value_name = "DIR")]
        prefix_dir: Option<PathBuf>,

        /// Voice pack locales to keep updated (e.g. en-us,ja-jp)
        #[arg(long = "voices", value_delimiter = ',')]
        voices: Vec<Locale>,
    },

    /// Show installed versions and what an update or pre-download would fetch
    Status,

    /// List versions published by the version server
    Versions,

    /// Show the installed game and voice pack versions (offline)
    Installed,

    /// Download the next release ahead of time, without installing it
    Predownload,

    /// Download and install the latest release
    Update {
        /// Download the full package when no diff matches the installed version
        #[arg(long)]
        full_fallback: bool,
    },

    /// View or change configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;

    let runner = match cli.command {
        Commands::Init { prefix_dir, voices } => {
            let args = InitArgs {
                install_dir: global.install_dir.clone(),
                prefix_dir,
                channel: global.channel,
                add_ons: voices,
            };
            return commands::init::run(args, &global.config_path());
        }
        Commands::Config(command) => {
            return commands::config::run(command, &global.config_path());
        }
        _ => CliRunner::new(&global)?,
    };

    match cli.command {
        Commands::Status => {
            runner.log_startup("status");
            commands::status::run(&runner)
        }
        Commands::Versions => {
            runner.log_startup("versions");
            commands::versions::run(&runner)
        }
        Commands::Installed => {
            runner.log_startup("installed");
            commands::installed::run(&runner)
        }
        Commands::Predownload => {
            runner.log_startup("predownload");
            commands::update::run(&runner, ResolveMode::PreDownload, false)
        }
        Commands::Update { full_fallback } => {
            runner.log_startup("update");
            commands::update::run(&runner, ResolveMode::Latest, full_fallback)
        }
        Commands::Init { .. } | Commands::Config(_) => {
            unreachable!("handled before the runner is created")
        }
    }
}
