//! Metadata events and lists attached to stream frames.
//!
//! A `MetadataEvent` is move-only: there is exactly one owner at any time.
//! The only way to produce a second object is [`MetadataEvent::duplicate`],
//! which a `MetadataHandler` calls when a clone is requested.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Metadata identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataId(pub u32);

impl MetadataId {
    /// End-of-stream marker
    pub const EOS: MetadataId = MetadataId(0x0A00_1000);

    /// Whether this id denotes end-of-stream
    #[inline]
    pub fn is_eos(self) -> bool {
        self == Self::EOS
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for MetadataId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// End-of-stream flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosFlags {
    /// Downstream must release buffered data immediately
    pub flushing: bool,

    /// Generated by pipeline conditions (upstream stop/flush), not a real stream end
    pub internal: bool,
}

impl EosFlags {
    pub fn flushing() -> Self {
        Self {
            flushing: true,
            internal: false,
        }
    }

    pub fn non_flushing() -> Self {
        Self::default()
    }

    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }
}

/// Metadata payload body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataPayload {
    /// End-of-stream marker
    Eos(EosFlags),

    /// Payload opaque to the splitter
    Opaque(Bytes),
}

/// Where the payload lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadStorage {
    /// Stored inside the event
    Inline,
    /// Stored in a separate allocation referenced by the event
    OutOfBand,
}

#[derive(Debug)]
enum PayloadSlot {
    Inline(MetadataPayload),
    OutOfBand(Box<MetadataPayload>),
}

impl PayloadSlot {
    fn new(payload: MetadataPayload, storage: PayloadStorage) -> Self {
        match storage {
            PayloadStorage::Inline => Self::Inline(payload),
            PayloadStorage::OutOfBand => Self::OutOfBand(Box::new(payload)),
        }
    }

    fn get(&self) -> &MetadataPayload {
        match self {
            Self::Inline(payload) => payload,
            Self::OutOfBand(payload) => payload,
        }
    }

    fn get_mut(&mut self) -> &mut MetadataPayload {
        match self {
            Self::Inline(payload) => payload,
            Self::OutOfBand(payload) => payload,
        }
    }

    fn storage(&self) -> PayloadStorage {
        match self {
            Self::Inline(_) => PayloadStorage::Inline,
            Self::OutOfBand(_) => PayloadStorage::OutOfBand,
        }
    }
}

/// A single control-plane event attached to a frame
///
/// Deliberately not `Clone`.
#[derive(Debug)]
pub struct MetadataEvent {
    id: MetadataId,
    /// Sample offset of the event within the frame
    offset: u32,
    slot: PayloadSlot,
}

impl MetadataEvent {
    /// Create an end-of-stream event with an inline payload
    pub fn eos(flags: EosFlags) -> Self {
        Self {
            id: MetadataId::EOS,
            offset: 0,
            slot: PayloadSlot::Inline(MetadataPayload::Eos(flags)),
        }
    }

    /// Create an opaque event with an inline payload
    ///
    /// # Errors
    /// `MetadataId::EOS` is reserved for [`MetadataEvent::eos`].
    pub fn custom(id: MetadataId, payload: impl Into<Bytes>) -> Result<Self, ContractError> {
        Self::new(id, MetadataPayload::Opaque(payload.into()), PayloadStorage::Inline)
    }

    /// Create an event, checking id/payload consistency
    pub fn new(
        id: MetadataId,
        payload: MetadataPayload,
        storage: PayloadStorage,
    ) -> Result<Self, ContractError> {
        match (&payload, id.is_eos()) {
            (MetadataPayload::Eos(_), false) => {
                return Err(ContractError::metadata_mismatch(
                    id,
                    "eos payload requires the eos metadata id",
                ))
            }
            (MetadataPayload::Opaque(_), true) => {
                return Err(ContractError::metadata_mismatch(
                    id,
                    "eos metadata id is reserved for eos payloads",
                ))
            }
            _ => {}
        }

        Ok(Self {
            id,
            offset: 0,
            slot: PayloadSlot::new(payload, storage),
        })
    }

    /// Move the payload into out-of-band storage
    pub fn out_of_band(mut self) -> Self {
        if let PayloadSlot::Inline(payload) = self.slot {
            self.slot = PayloadSlot::OutOfBand(Box::new(payload));
        }
        self
    }

    /// Set the sample offset
    pub fn at_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn id(&self) -> MetadataId {
        self.id
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn is_out_of_band(&self) -> bool {
        self.slot.storage() == PayloadStorage::OutOfBand
    }

    pub fn storage(&self) -> PayloadStorage {
        self.slot.storage()
    }

    pub fn payload(&self) -> &MetadataPayload {
        self.slot.get()
    }

    /// EOS flags, resolved through inline or out-of-band storage
    pub fn eos_flags(&self) -> Option<EosFlags> {
        match self.slot.get() {
            MetadataPayload::Eos(flags) => Some(*flags),
            MetadataPayload::Opaque(_) => None,
        }
    }

    /// Update the internal flag of an EOS event; no-op for other events
    pub fn set_eos_internal(&mut self, internal: bool) {
        if let MetadataPayload::Eos(flags) = self.slot.get_mut() {
            flags.internal = internal;
        }
    }

    /// Produce an independent copy, including a fresh out-of-band allocation
    pub fn duplicate(&self) -> Self {
        Self {
            id: self.id,
            offset: self.offset,
            slot: PayloadSlot::new(self.slot.get().clone(), self.slot.storage()),
        }
    }
}

/// Ordered, owning sequence of metadata events
///
/// Moving an event into a list moves ownership; there are no shared links.
#[derive(Debug, Default)]
pub struct MetadataList {
    events: VecDeque<MetadataEvent>,
}

impl MetadataList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: MetadataEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataEvent> {
        self.events.iter()
    }

    pub fn ids(&self) -> Vec<MetadataId> {
        self.events.iter().map(MetadataEvent::id).collect()
    }

    /// Detach every event, leaving this list empty
    pub fn take(&mut self) -> MetadataList {
        std::mem::take(self)
    }
}

impl IntoIterator for MetadataList {
    type Item = MetadataEvent;
    type IntoIter = std::collections::vec_deque::IntoIter<MetadataEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl FromIterator<MetadataEvent> for MetadataList {
    fn from_iter<T: IntoIterator<Item = MetadataEvent>>(iter: T) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}
