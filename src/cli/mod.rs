//! CLI command implementations.

pub mod config;
pub mod disable;
pub mod enable;
pub mod exec;
pub mod health;
pub mod list;
pub mod output;
pub mod pattern;
pub mod reset;

use crate::config::Config;
use crate::error::Result;
use crate::storage::FileBackend;

/// Open the configured state file.
///
/// # Errors
///
/// Returns an error if the state directory cannot be created.
pub fn open_store(config: &Config) -> Result<FileBackend> {
    FileBackend::new(config.state_file.clone(), config.circuit_breaker.clone())
}
