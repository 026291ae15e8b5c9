//! CLI error type.

use std::fmt;

use launchkit::config::ConfigError;
use launchkit::logging::LoggingError;
use launchkit::manager::ManagerError;
use launchkit::orchestrator::OrchestratorError;

/// Any failure surfaced to the user.
#[derive(Debug)]
pub enum CliError {
    /// Missing or inconsistent settings.
    Config(String),
    /// The configuration file could not be read or written.
    ConfigFile(ConfigError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// A manager operation failed.
    Manager(ManagerError),
    /// An update run aborted.
    Update(OrchestratorError),
    /// The async runtime could not be started.
    Runtime(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Manager(e) => write!(f, "{}", e),
            CliError::Update(e) if e.is_cancelled() => write!(f, "Interrupted during {}", e.stage()),
            CliError::Update(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Manager(e) => Some(e),
            CliError::Update(e) => Some(e),
            CliError::Runtime(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Manager(e)
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        CliError::Update(e)
    }
}
