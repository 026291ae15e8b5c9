//! Shared setup for commands that touch an install.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use launchkit::config::{config_file_path, ConfigFile};
use launchkit::logging::{init_logging, WorkerGuard};
use launchkit::manager::{Channel, ManagerConfig};
use launchkit::orchestrator::{UpdateOrchestrator, WinePrefix};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Options accepted by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Configuration file to use instead of the default
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Game install directory (overrides paths.install_dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Distribution channel: global or cn (overrides general.channel)
    #[arg(long, global = true)]
    pub channel: Option<Channel>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Configuration file path in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }

    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let mut config = ConfigFile::load_from(&self.config_path())?;
        if let Some(dir) = &self.install_dir {
            config.paths.install_dir = Some(dir.clone());
        }
        if let Some(channel) = self.channel {
            config.general.channel = channel;
        }
        Ok(config)
    }
}

/// Configuration, logging and async runtime for one command invocation.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _log_guard: WorkerGuard,
}

impl CliRunner {
    /// Load configuration, start logging and build the runtime.
    pub fn new(args: &GlobalArgs) -> Result<Self, CliError> {
        let config = args.load_config()?;
        let log_guard = init_logging(&config.log_file(), args.verbose)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            runtime,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Record the invocation in the log file.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = launchkit::VERSION,
            command,
            channel = %self.config.general.channel,
            install_dir = ?self.config.paths.install_dir,
            "launchkit started"
        );
    }

    /// Manager settings; fails when no install directory is configured.
    pub fn manager_config(&self) -> Result<ManagerConfig, CliError> {
        self.config.to_manager_config().map_err(|_| {
            CliError::Config(
                "No install directory specified. Use --install-dir or set install_dir in config.ini [paths] section."
                    .to_string(),
            )
        })
    }

    /// Orchestrator for the configured install, gated on the Wine prefix
    /// when one is configured.
    pub fn orchestrator(&self, config: &ManagerConfig) -> Result<UpdateOrchestrator, CliError> {
        if config.metadata_url().is_none() {
            return Err(CliError::Config(format!(
                "No versions URL for channel {}. Set {}_url in config.ini [metadata] section.",
                config.channel, config.channel
            )));
        }

        let mut orchestrator = UpdateOrchestrator::from_config(config)?;
        if let Some(prefix) = &self.config.paths.prefix_dir {
            orchestrator = orchestrator.with_prerequisite(Arc::new(WinePrefix::new(prefix.clone())));
        }
        Ok(orchestrator)
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
