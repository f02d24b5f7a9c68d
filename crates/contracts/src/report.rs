//! FrameReport - outcome of processing one frame

use serde::{Deserialize, Serialize};

use crate::{MetadataId, PortId};

/// Overall frame status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Every accepted event reached every accepting port
    #[default]
    Ok,
    /// At least one metadata duplicate was lost; data still propagated
    Degraded,
}

/// A clone that could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneFailure {
    pub metadata_id: MetadataId,

    /// Port that should have received the duplicate
    pub port_index: usize,

    pub message: String,
}

/// Per-port delivery summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDelivery {
    pub port_index: usize,
    pub port_id: PortId,

    /// Recorded length of the first channel buffer
    pub bytes: usize,

    /// Data forwarded in place, without a copy
    pub in_place: bool,

    /// Metadata events appended to the port during this frame
    pub metadata_events: usize,

    /// Flushing EOS marker set on the port
    pub marker_eos: bool,
}

/// Outcome of one `process` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Ports that received data, in index order
    pub deliveries: Vec<PortDelivery>,

    /// Events moved to their first accepting port
    pub metadata_transferred: u32,

    /// Duplicates appended to later accepting ports
    pub metadata_cloned: u32,

    /// Events no port accepted
    pub metadata_dropped: u32,

    pub clone_failures: Vec<CloneFailure>,
}

impl FrameReport {
    pub fn status(&self) -> FrameStatus {
        if self.clone_failures.is_empty() {
            FrameStatus::Ok
        } else {
            FrameStatus::Degraded
        }
    }

    /// Total bytes recorded across all ports
    pub fn bytes_delivered(&self) -> usize {
        self.deliveries.iter().map(|d| d.bytes).sum()
    }

    pub fn delivery(&self, port_index: usize) -> Option<&PortDelivery> {
        self.deliveries.iter().find(|d| d.port_index == port_index)
    }

    /// Treat a degraded frame as a failure
    pub fn into_result(self) -> Result<Self, CloneFailure> {
        match self.clone_failures.first() {
            Some(failure) => Err(failure.clone()),
            None => Ok(self),
        }
    }
}
