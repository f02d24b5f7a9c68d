//! MetadataHandler trait - clone/destroy services for metadata events
//!
//! The splitter never duplicates or releases an event on its own; it asks
//! the handler. This keeps allocation policy with the hosting framework.

use crate::{ContractError, MetadataEvent};

/// Metadata clone/destroy interface
pub trait MetadataHandler {
    /// Produce an independent duplicate of `event`
    ///
    /// # Errors
    /// Returns `ContractError::MetadataClone` when the duplicate cannot be allocated.
    fn clone_event(&mut self, event: &MetadataEvent) -> Result<MetadataEvent, ContractError>;

    /// Release `event`; `dropped` is true when no consumer ever received it
    fn destroy(&mut self, event: MetadataEvent, dropped: bool);
}

impl<H: MetadataHandler + ?Sized> MetadataHandler for &mut H {
    fn clone_event(&mut self, event: &MetadataEvent) -> Result<MetadataEvent, ContractError> {
        (**self).clone_event(event)
    }

    fn destroy(&mut self, event: MetadataEvent, dropped: bool) {
        (**self).destroy(event, dropped)
    }
}

impl<H: MetadataHandler + ?Sized> MetadataHandler for Box<H> {
    fn clone_event(&mut self, event: &MetadataEvent) -> Result<MetadataEvent, ContractError> {
        (**self).clone_event(event)
    }

    fn destroy(&mut self, event: MetadataEvent, dropped: bool) {
        (**self).destroy(event, dropped)
    }
}
