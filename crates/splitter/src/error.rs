//! Splitter error types

use thiserror::Error;

use contracts::{CloneFailure, ContractError, MetadataId};

/// Splitter-specific errors
#[derive(Debug, Error)]
pub enum SplitterError {
    /// `process` called before the input media format was established
    #[error("input media format not set")]
    MediaFormatNotSet,

    /// Media format rejected
    #[error("invalid media format: {message}")]
    InvalidMediaFormat { message: String },

    /// First output frame handle missing
    #[error("first output frame is missing")]
    MissingOutput,

    /// Source frame unusable
    #[error("invalid source frame: {message}")]
    InvalidSource { message: String },

    /// Port index does not name a configured port
    #[error("port index {index} out of range ({count} ports)")]
    PortIndexOutOfRange { index: usize, count: usize },

    /// A metadata duplicate was lost
    #[error("metadata {metadata_id} not delivered to port {port_index}: {message}")]
    MetadataClone {
        metadata_id: MetadataId,
        port_index: usize,
        message: String,
    },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl SplitterError {
    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource {
            message: message.into(),
        }
    }

    pub fn invalid_media_format(message: impl Into<String>) -> Self {
        Self::InvalidMediaFormat {
            message: message.into(),
        }
    }
}

impl From<CloneFailure> for SplitterError {
    fn from(failure: CloneFailure) -> Self {
        Self::MetadataClone {
            metadata_id: failure.metadata_id,
            port_index: failure.port_index,
            message: failure.message,
        }
    }
}
