//! Default metadata handler backed by the process heap.

use contracts::{ContractError, MetadataEvent, MetadataHandler};
use tracing::debug;

/// Heap-backed clone/destroy service
///
/// An optional clone budget models a bounded metadata heap: once it is
/// spent, every further clone request fails.
#[derive(Debug, Default)]
pub struct HeapMetadataHandler {
    clone_budget: Option<usize>,
    cloned: u64,
    dropped: u64,
    released: u64,
}

impl HeapMetadataHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of successful clones
    pub fn with_clone_budget(budget: usize) -> Self {
        Self {
            clone_budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn cloned(&self) -> u64 {
        self.cloned
    }

    /// Events destroyed without ever reaching a consumer
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// All destroyed events: dropped ones plus those the host consumed
    /// and handed back with `destroy(event, false)`
    pub fn released(&self) -> u64 {
        self.released
    }
}

impl MetadataHandler for HeapMetadataHandler {
    fn clone_event(&mut self, event: &MetadataEvent) -> Result<MetadataEvent, ContractError> {
        if let Some(budget) = self.clone_budget.as_mut() {
            if *budget == 0 {
                return Err(ContractError::metadata_clone(
                    event.id(),
                    "metadata heap exhausted",
                ));
            }
            *budget -= 1;
        }

        self.cloned += 1;
        Ok(event.duplicate())
    }

    fn destroy(&mut self, event: MetadataEvent, dropped: bool) {
        self.released += 1;
        if dropped {
            self.dropped += 1;
            debug!(metadata_id = %event.id(), "metadata dropped, no accepting port");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EosFlags, MetadataId};

    #[test]
    fn test_clone_budget_exhaustion() {
        let mut handler = HeapMetadataHandler::with_clone_budget(1);
        let event = MetadataEvent::eos(EosFlags::flushing());

        assert!(handler.clone_event(&event).is_ok());
        let err = handler.clone_event(&event).unwrap_err();
        assert!(matches!(err, ContractError::MetadataClone { id, .. } if id == MetadataId::EOS));
        assert_eq!(handler.cloned(), 1);
        assert!(handler.clone_event(&event).is_err());
    }

    #[test]
    fn test_destroy_counts() {
        let mut handler = HeapMetadataHandler::new();
        handler.destroy(MetadataEvent::custom(MetadataId(5), vec![1u8]).unwrap(), true);
        handler.destroy(MetadataEvent::eos(EosFlags::default()), false);

        assert_eq!(handler.dropped(), 1);
        assert_eq!(handler.released(), 2);
    }
}
