//! Logging setup.
//!
//! Everything is written to a log file through a non-blocking writer.
//! Warnings also go to stderr, or every event when verbose, so progress
//! bars stay readable during normal runs.
//!
//! `RUST_LOG` overrides the default filter unless verbose output is asked
//! for.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub use tracing_appender::non_blocking::WorkerGuard;

const DEFAULT_FILTER: &str = "launchkit=info,launchkit_cli=info";
const VERBOSE_FILTER: &str = "launchkit=debug,launchkit_cli=debug";

/// Logging could not be initialised.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log file path: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to install logger: {0}")]
    Init(String),
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the program; dropping
/// it flushes and stops the file writer.
pub fn init_logging(log_file: &Path, verbose: bool) -> Result<WorkerGuard, LoggingError> {
    let file_name = log_file
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(log_file.to_path_buf()))?;
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir).map_err(|e| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    // The local offset is unavailable in multi-threaded processes on some platforms
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(timer);

    let stderr_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_init_creates_log_directory_once() {
        let temp = TempDir::new().unwrap();
        let log_file = temp.path().join("logs").join("launchkit.log");

        let guard = init_logging(&log_file, false).unwrap();
        assert!(temp.path().join("logs").is_dir());

        // Only one global subscriber per process
        assert!(matches!(
            init_logging(&log_file, true),
            Err(LoggingError::Init(_))
        ));
        drop(guard);
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        assert!(matches!(
            init_logging(Path::new("/"), false),
            Err(LoggingError::InvalidPath(_))
        ));
    }
}
