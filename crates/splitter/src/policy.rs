//! Port policy table: per-port allow-lists of metadata ids.
//!
//! Built once from the propagation configuration and looked up per event.

use std::collections::{HashMap, HashSet};

use contracts::{MetadataId, MetadataPropagationConfig, PortId};

use crate::port::OutputPort;

/// Metadata ids one port accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(HashSet<MetadataId>);

impl AllowList {
    pub fn contains(&self, id: MetadataId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MetadataId> for AllowList {
    fn from_iter<T: IntoIterator<Item = MetadataId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-port allow-lists keyed by port id
#[derive(Debug, Clone, Default)]
pub struct PortPolicyTable {
    allow_lists: HashMap<PortId, AllowList>,
}

impl PortPolicyTable {
    /// Build the table; a repeated port id extends the earlier entry
    pub fn from_config(config: &MetadataPropagationConfig) -> Self {
        let mut allow_lists: HashMap<PortId, AllowList> = HashMap::new();
        for entry in &config.ports {
            allow_lists
                .entry(entry.port_id)
                .or_default()
                .0
                .extend(entry.allowed.iter().copied());
        }
        Self { allow_lists }
    }

    pub fn allow_list(&self, port_id: PortId) -> Option<&AllowList> {
        self.allow_lists.get(&port_id)
    }

    /// Whether `port_id` has a non-empty allow-list containing `id`
    pub fn allows(&self, port_id: PortId, id: MetadataId) -> bool {
        self.allow_list(port_id)
            .is_some_and(|list| list.contains(id))
    }

    /// Number of ports with an entry
    pub fn len(&self) -> usize {
        self.allow_lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allow_lists.is_empty()
    }
}

/// Decide whether `id` must not be delivered to `port`
///
/// Blocked unless a table is installed, the port is not globally blocked,
/// and the port's allow-list names `id`. Total: never fails.
pub fn is_blocked(table: Option<&PortPolicyTable>, port: &OutputPort, id: MetadataId) -> bool {
    let Some(table) = table else {
        return true;
    };

    if port.all_metadata_blocked {
        return true;
    }

    !table.allows(port.id, id)
}
