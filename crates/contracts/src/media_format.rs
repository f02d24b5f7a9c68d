//! Input media format

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Channel buffer layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferLayout {
    /// All channels in one buffer
    Interleaved,
    /// One buffer per channel, each with its own length
    DeinterleavedPacked,
    /// One buffer per channel, length tracked on the first buffer only
    #[default]
    DeinterleavedUnpacked,
}

/// PCM media format of the input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MediaFormat {
    #[validate(range(min = 1, max = 384000))]
    pub sample_rate: u32,

    #[validate(range(min = 16, max = 32))]
    pub bits_per_sample: u16,

    #[validate(range(min = 1, max = 32))]
    pub num_channels: u16,

    #[serde(default)]
    pub layout: BufferLayout,
}

impl MediaFormat {
    /// Number of channel buffers a frame carries
    pub fn buffers_per_frame(&self) -> usize {
        match self.layout {
            BufferLayout::Interleaved => 1,
            _ => self.num_channels as usize,
        }
    }

    /// Whether every channel buffer records its own length
    pub fn records_length_per_channel(&self) -> bool {
        self.layout != BufferLayout::DeinterleavedUnpacked
    }

    /// Bytes per sample
    pub fn bytes_per_sample(&self) -> usize {
        match self.bits_per_sample {
            16 => 2,
            24 => 3,
            _ => 4,
        }
    }
}

impl Default for MediaFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            bits_per_sample: 16,
            num_channels: 2,
            layout: BufferLayout::default(),
        }
    }
}
