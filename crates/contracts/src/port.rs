//! Output port identity, state and timestamp propagation mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output port identifier (as used by the propagation configuration)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational state of an output port
///
/// Transitions are driven by port start/stop/close commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortState {
    #[default]
    Inactive,
    Started,
    Closed,
}

/// How an output port's timestamp is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsPropagation {
    /// Copy the input timestamp and its validity
    #[default]
    Source,
    /// Use the timestamp latched from an external clock
    Latched,
    /// Always mark the timestamp invalid
    Invalid,
}

/// Timestamp latched from an external clock source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchedTimestamp {
    /// Microseconds
    pub timestamp_us: i64,
    pub valid: bool,
}
