//! SplitterBlueprint - Config Loader output
//!
//! Describes the complete splitter configuration: input media format, output
//! ports, per-port metadata propagation and an optional simulation script.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    ContractError, EosFlags, MediaFormat, MetadataEvent, MetadataId, PortId, PortState,
    TsPropagation,
};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete splitter configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SplitterBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Input media format
    #[validate(nested)]
    pub media_format: MediaFormat,

    /// Output ports, in index order
    #[validate(length(min = 1, max = 16))]
    pub ports: Vec<PortConfig>,

    /// Per-port metadata allow-lists; absent means no table is installed
    #[serde(default)]
    pub metadata_propagation: Option<MetadataPropagationConfig>,

    /// Scripted run for the simulator
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

/// Output port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    pub port_id: PortId,

    #[serde(default = "default_initial_state")]
    pub initial_state: PortState,

    #[serde(default)]
    pub ts_propagation: TsPropagation,

    /// Block every metadata event regardless of the allow-list
    #[serde(default)]
    pub block_all_metadata: bool,

    /// Output buffer capacity per channel (bytes); defaults to one full frame
    #[serde(default)]
    pub capacity_bytes: Option<usize>,
}

fn default_initial_state() -> PortState {
    PortState::Started
}

/// Metadata propagation configuration, as received from the control path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPropagationConfig {
    #[serde(default)]
    pub ports: Vec<PortMetadataConfig>,
}

/// Allow-list of one output port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMetadataConfig {
    pub port_id: PortId,

    /// Metadata ids the port accepts
    #[serde(default)]
    pub allowed: Vec<MetadataId>,
}

/// Simulation script
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    /// Number of frames to generate
    #[validate(range(min = 1))]
    pub frames: u64,

    /// Frame duration (milliseconds)
    #[serde(default = "default_frame_duration_ms")]
    #[validate(range(min = 1, max = 1000))]
    pub frame_duration_ms: u32,

    /// Offset of the external clock relative to the stream clock (microseconds)
    #[serde(default)]
    pub latched_clock_offset_us: i64,

    /// Port forwarded in place (output aliases input memory)
    #[serde(default)]
    pub in_place_port: Option<PortId>,

    /// Metadata attached to input frames
    #[serde(default)]
    pub metadata: Vec<ScriptedMetadata>,

    /// Port state changes applied before a frame
    #[serde(default)]
    pub port_changes: Vec<ScriptedPortChange>,
}

fn default_frame_duration_ms() -> u32 {
    10
}

/// Metadata event attached to a given input frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedMetadata {
    Eos {
        frame: u64,
        #[serde(default)]
        flushing: bool,
        #[serde(default)]
        internal: bool,
        #[serde(default)]
        out_of_band: bool,
    },
    Custom {
        frame: u64,
        id: MetadataId,
        #[serde(default, with = "serde_bytes")]
        payload: Vec<u8>,
        #[serde(default)]
        out_of_band: bool,
    },
}

impl ScriptedMetadata {
    /// Input frame index the event is attached to
    pub fn frame(&self) -> u64 {
        match self {
            Self::Eos { frame, .. } | Self::Custom { frame, .. } => *frame,
        }
    }

    /// Build the event
    pub fn to_event(&self) -> Result<MetadataEvent, ContractError> {
        let (event, out_of_band) = match self {
            Self::Eos {
                flushing,
                internal,
                out_of_band,
                ..
            } => (
                MetadataEvent::eos(EosFlags {
                    flushing: *flushing,
                    internal: *internal,
                }),
                *out_of_band,
            ),
            Self::Custom {
                id,
                payload,
                out_of_band,
                ..
            } => (MetadataEvent::custom(*id, payload.clone())?, *out_of_band),
        };

        Ok(if out_of_band {
            event.out_of_band()
        } else {
            event
        })
    }
}

/// Port state change applied before a given input frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedPortChange {
    pub frame: u64,
    pub port_id: PortId,
    pub state: PortState,
}
