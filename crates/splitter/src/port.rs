//! Output port model

use contracts::{MetadataId, PortConfig, PortId, PortState, StreamFrame, TsPropagation};

use crate::policy::PortPolicyTable;

/// One destination port of the splitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    pub id: PortId,
    pub state: PortState,
    pub ts_propagation: TsPropagation,

    /// Blocks every metadata event regardless of the allow-list
    pub all_metadata_blocked: bool,

    /// EOS is forwarded as-is; otherwise it is re-marked internal for this port
    pub eos_passthrough: bool,
}

impl OutputPort {
    /// Port in the inactive state with default modes
    pub fn new(id: PortId) -> Self {
        Self {
            id,
            state: PortState::Inactive,
            ts_propagation: TsPropagation::Source,
            all_metadata_blocked: false,
            eos_passthrough: true,
        }
    }

    pub fn with_state(mut self, state: PortState) -> Self {
        self.state = state;
        self
    }

    pub fn with_ts_propagation(mut self, mode: TsPropagation) -> Self {
        self.ts_propagation = mode;
        self
    }

    /// Active: started, with a frame bound that has a first buffer
    pub fn is_active(&self, frame: Option<&StreamFrame>) -> bool {
        self.state == PortState::Started && frame.is_some_and(StreamFrame::has_buffer)
    }

    /// Recompute EOS passthrough from an installed table (or its absence)
    pub(crate) fn refresh_eos_passthrough(&mut self, table: Option<&PortPolicyTable>) {
        self.eos_passthrough = match table {
            None => true,
            Some(table) => table.allows(self.id, MetadataId::EOS),
        };
    }
}

impl From<&PortConfig> for OutputPort {
    fn from(config: &PortConfig) -> Self {
        Self {
            all_metadata_blocked: config.block_all_metadata,
            ..Self::new(config.port_id)
                .with_state(config.initial_state)
                .with_ts_propagation(config.ts_propagation)
        }
    }
}
