//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Splitter rejected the configuration or a frame
    #[error("Splitter error: {0}")]
    Splitter(#[from] splitter::SplitterError),

    /// Simulation script cannot be executed
    #[error("Simulation error: {message}")]
    Simulation { message: String },

    /// Contract error (e.g. a scripted event that cannot be built)
    #[error("Contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn simulation(message: impl Into<String>) -> Self {
        Self::Simulation {
            message: message.into(),
        }
    }
}
