//! CLI command implementations.

pub mod config;
pub mod init;
pub mod installed;
pub mod status;
pub mod update;
pub mod versions;
