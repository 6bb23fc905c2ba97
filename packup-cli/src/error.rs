//! CLI error type.

use packup::config::ConfigError;
use packup::ManagerError;
use thiserror::Error;

/// Errors surfaced to the user. Any of them ends the process with exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad command-line or configuration input.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Update(#[from] ManagerError),
}
