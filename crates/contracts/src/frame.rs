//! StreamFrame - one frame of samples plus its control flags and metadata.

use bytes::{Bytes, BytesMut};

use crate::MetadataList;

/// Frame-level flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    /// Timestamp carries a meaningful value
    pub timestamp_valid: bool,

    /// Last buffer of a frame
    pub end_of_frame: bool,

    /// A flushing EOS was propagated with this frame
    pub marker_eos: bool,

    /// Samples were synthesized to conceal a gap
    pub erasure: bool,

    pub marker_1: bool,
    pub marker_2: bool,
    pub marker_3: bool,
}

impl FrameFlags {
    /// OR every flag of `source` into `self`, keeping this frame's own `marker_eos`
    pub fn merge_preserving_eos(&mut self, source: &FrameFlags) {
        let marker_eos = self.marker_eos;

        self.timestamp_valid |= source.timestamp_valid;
        self.end_of_frame |= source.end_of_frame;
        self.erasure |= source.erasure;
        self.marker_1 |= source.marker_1;
        self.marker_2 |= source.marker_2;
        self.marker_3 |= source.marker_3;

        self.marker_eos = marker_eos;
    }
}

/// Backing memory of a channel buffer
#[derive(Debug, Clone)]
enum BufferMemory {
    /// Writable memory owned by this buffer
    Owned(BytesMut),

    /// Reference-counted memory, possibly shared with another frame
    Shared(Bytes),
}

/// One channel sub-buffer
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    memory: BufferMemory,
    actual_len: usize,
    max_len: usize,
}

impl ChannelBuffer {
    /// Empty writable buffer with the given capacity
    pub fn with_capacity(max_len: usize) -> Self {
        Self {
            memory: BufferMemory::Owned(BytesMut::with_capacity(max_len)),
            actual_len: 0,
            max_len,
        }
    }

    /// Filled buffer; capacity equals the data length
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len();
        Self {
            memory: BufferMemory::Shared(data),
            actual_len: len,
            max_len: len,
        }
    }

    /// Buffer aliasing the memory of `other`
    ///
    /// Only shared memory can be aliased; `None` for a writable owned buffer.
    pub fn aliasing(other: &ChannelBuffer) -> Option<Self> {
        match &other.memory {
            BufferMemory::Shared(bytes) => Some(Self {
                memory: BufferMemory::Shared(bytes.clone()),
                actual_len: 0,
                max_len: other.max_len,
            }),
            BufferMemory::Owned(_) => None,
        }
    }

    /// Reduce the capacity (e.g. an aliasing view smaller than the source)
    pub fn limit_capacity(mut self, max_len: usize) -> Self {
        self.max_len = self.max_len.min(max_len);
        self
    }

    /// Valid bytes (up to the recorded length)
    pub fn data(&self) -> &[u8] {
        let raw = self.raw();
        &raw[..self.actual_len.min(raw.len())]
    }

    /// Everything written to memory, regardless of the recorded length
    pub fn raw(&self) -> &[u8] {
        match &self.memory {
            BufferMemory::Owned(bytes) => &bytes[..],
            BufferMemory::Shared(bytes) => &bytes[..],
        }
    }

    pub fn actual_len(&self) -> usize {
        self.actual_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Whether both buffers are views of the same memory
    pub fn same_memory(&self, other: &ChannelBuffer) -> bool {
        match (&self.memory, &other.memory) {
            (BufferMemory::Shared(a), BufferMemory::Shared(b)) => {
                !a.is_empty() && a.as_ptr() == b.as_ptr()
            }
            _ => false,
        }
    }

    /// Record a length without touching memory, clamped to what memory holds
    pub fn set_actual_len(&mut self, len: usize) {
        self.actual_len = len.min(self.raw().len());
    }

    /// Write at most `max_len` bytes of `src` without recording a length
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.max_len);
        match &mut self.memory {
            BufferMemory::Owned(bytes) => {
                bytes.clear();
                bytes.extend_from_slice(&src[..n]);
            }
            BufferMemory::Shared(bytes) => {
                *bytes = Bytes::copy_from_slice(&src[..n]);
            }
        }
        n
    }
}

/// A frame of samples
#[derive(Debug, Default)]
pub struct StreamFrame {
    /// One buffer per channel (or a single interleaved buffer)
    pub buffers: Vec<ChannelBuffer>,

    pub flags: FrameFlags,

    /// Microseconds
    pub timestamp_us: i64,

    /// Attached control events, in order
    pub metadata: MetadataList,
}

impl StreamFrame {
    /// Frame with the given channel buffers
    pub fn with_buffers(buffers: Vec<ChannelBuffer>) -> Self {
        Self {
            buffers,
            ..Default::default()
        }
    }

    /// Writable destination frame with `channels` buffers of `capacity` bytes each
    pub fn output(channels: usize, capacity: usize) -> Self {
        Self::with_buffers(
            (0..channels)
                .map(|_| ChannelBuffer::with_capacity(capacity))
                .collect(),
        )
    }

    /// Whether the frame has a bound first buffer
    pub fn has_buffer(&self) -> bool {
        self.buffers.first().is_some_and(|b| b.max_len() > 0)
    }

    /// Recorded length of the first buffer
    pub fn actual_len(&self) -> usize {
        self.buffers.first().map_or(0, ChannelBuffer::actual_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_marker_eos() {
        let mut dst = FrameFlags::default();
        let src = FrameFlags {
            marker_eos: true,
            end_of_frame: true,
            ..Default::default()
        };

        dst.merge_preserving_eos(&src);
        assert!(dst.end_of_frame);
        assert!(!dst.marker_eos);

        dst.marker_eos = true;
        dst.merge_preserving_eos(&FrameFlags::default());
        assert!(dst.marker_eos);
    }

    #[test]
    fn test_write_clamps_to_capacity() {
        let mut buf = ChannelBuffer::with_capacity(4);
        let written = buf.write(&[1, 2, 3, 4, 5, 6]);
        buf.set_actual_len(written);
        assert_eq!(written, 4);
        assert_eq!(buf.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_write_does_not_record_length() {
        let mut buf = ChannelBuffer::with_capacity(8);
        assert_eq!(buf.write(&[9, 9, 9]), 3);
        assert_eq!(buf.actual_len(), 0);
        assert_eq!(buf.raw(), &[9, 9, 9]);

        buf.set_actual_len(5);
        assert_eq!(buf.actual_len(), 3);
    }

    #[test]
    fn test_same_memory_detection() {
        let src = ChannelBuffer::from_bytes(vec![1u8, 2, 3]);
        let alias = ChannelBuffer::aliasing(&src).unwrap();
        let other = ChannelBuffer::from_bytes(vec![1u8, 2, 3]);

        assert!(alias.same_memory(&src));
        assert!(!other.same_memory(&src));
        assert!(!ChannelBuffer::with_capacity(3).same_memory(&src));
    }

    #[test]
    fn test_owned_memory_cannot_be_aliased() {
        let mut owned = ChannelBuffer::with_capacity(4);
        owned.write(&[7, 7]);
        assert!(ChannelBuffer::aliasing(&owned).is_none());

        let shared = ChannelBuffer::from_bytes(vec![7u8; 4]);
        let alias = ChannelBuffer::aliasing(&shared).unwrap();
        assert_eq!(alias.max_len(), 4);
        assert_eq!(alias.actual_len(), 0);
    }

    #[test]
    fn test_has_buffer() {
        assert!(!StreamFrame::default().has_buffer());
        assert!(!StreamFrame::output(2, 0).has_buffer());
        assert!(StreamFrame::output(2, 16).has_buffer());
    }
}
