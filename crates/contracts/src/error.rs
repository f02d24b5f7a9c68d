//! Layered error definitions
//!
//! Categorized by source: config / metadata / io

use thiserror::Error;

use crate::MetadataId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Metadata Errors =====
    /// Metadata id and payload disagree
    #[error("metadata {id}: {message}")]
    MetadataMismatch { id: MetadataId, message: String },

    /// Metadata duplicate could not be allocated
    #[error("failed to clone metadata {id}: {message}")]
    MetadataClone { id: MetadataId, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create metadata mismatch error
    pub fn metadata_mismatch(id: MetadataId, message: impl Into<String>) -> Self {
        Self::MetadataMismatch {
            id,
            message: message.into(),
        }
    }

    /// Create metadata clone error
    pub fn metadata_clone(id: MetadataId, message: impl Into<String>) -> Self {
        Self::MetadataClone {
            id,
            message: message.into(),
        }
    }
}
