//! LaunchKit - game update and predownload manager
//!
//! This library keeps a locally installed game and its add-on (voice)
//! packages up to date against a remote version server, and fetches the
//! next release ahead of time when the server publishes it.
//!
//! # Modules
//!
//! - [`package`]: server metadata and installed-state data model
//! - [`manager`]: target resolution, version estimation, metadata and
//!   download boundaries
//! - [`orchestrator`]: the staged update pipeline
//! - [`config`]: `config.ini` handling
//! - [`logging`]: tracing setup
//!
//! # Example
//!
//! ```ignore
//! use launchkit::config::ConfigFile;
//! use launchkit::manager::ResolveMode;
//! use launchkit::orchestrator::UpdateOrchestrator;
//!
//! let config = ConfigFile::load()?.to_manager_config()?;
//! let orchestrator = UpdateOrchestrator::from_config(&config)?;
//! let report = orchestrator.run(ResolveMode::Latest, None).await?;
//! ```

pub mod config;
pub mod logging;
pub mod manager;
pub mod orchestrator;
pub mod package;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
