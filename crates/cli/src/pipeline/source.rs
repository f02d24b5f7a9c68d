//! Synthetic input frames: one sine tone per channel.

use std::f64::consts::TAU;

use contracts::{BufferLayout, ChannelBuffer, MediaFormat, StreamFrame};

const BASE_FREQUENCY_HZ: f64 = 440.0;
const AMPLITUDE: f64 = 0.5;

/// Generates consecutive input frames for a media format
#[derive(Debug, Clone)]
pub struct FrameSource {
    format: MediaFormat,
    samples_per_frame: usize,
    frame_duration_us: i64,
}

impl FrameSource {
    pub fn new(format: MediaFormat, frame_duration_ms: u32) -> Self {
        let samples_per_frame =
            (u64::from(format.sample_rate) * u64::from(frame_duration_ms) / 1000).max(1) as usize;
        Self {
            format,
            samples_per_frame,
            frame_duration_us: i64::from(frame_duration_ms) * 1000,
        }
    }

    /// Bytes in one channel buffer (the whole frame when interleaved)
    pub fn bytes_per_buffer(&self) -> usize {
        let per_channel = self.samples_per_frame * self.format.bytes_per_sample();
        match self.format.layout {
            BufferLayout::Interleaved => per_channel * self.format.num_channels as usize,
            _ => per_channel,
        }
    }

    /// Stream timestamp of frame `index`
    pub fn timestamp_us(&self, index: u64) -> i64 {
        index as i64 * self.frame_duration_us
    }

    /// Build frame `index` with valid timestamp and end-of-frame set
    pub fn frame(&self, index: u64) -> StreamFrame {
        let channels = self.format.num_channels as usize;
        let first_sample = index as usize * self.samples_per_frame;

        let buffers = match self.format.layout {
            BufferLayout::Interleaved => {
                let mut bytes = Vec::with_capacity(self.bytes_per_buffer());
                for n in 0..self.samples_per_frame {
                    for channel in 0..channels {
                        self.push_sample(&mut bytes, channel, first_sample + n);
                    }
                }
                vec![ChannelBuffer::from_bytes(bytes)]
            }
            _ => (0..channels)
                .map(|channel| {
                    let mut bytes = Vec::with_capacity(self.bytes_per_buffer());
                    for n in 0..self.samples_per_frame {
                        self.push_sample(&mut bytes, channel, first_sample + n);
                    }
                    ChannelBuffer::from_bytes(bytes)
                })
                .collect(),
        };

        let mut frame = StreamFrame::with_buffers(buffers);
        frame.timestamp_us = self.timestamp_us(index);
        frame.flags.timestamp_valid = true;
        frame.flags.end_of_frame = true;
        frame
    }

    fn push_sample(&self, out: &mut Vec<u8>, channel: usize, n: usize) {
        let frequency = BASE_FREQUENCY_HZ * (channel + 1) as f64;
        let t = n as f64 / f64::from(self.format.sample_rate);
        let value = AMPLITUDE * (TAU * frequency * t).sin();

        match self.format.bits_per_sample {
            16 => out.extend_from_slice(&((value * f64::from(i16::MAX)) as i16).to_le_bytes()),
            24 => {
                let sample = (value * f64::from((1 << 23) - 1)) as i32;
                out.extend_from_slice(&sample.to_le_bytes()[..3]);
            }
            _ => out.extend_from_slice(&((value * f64::from(i32::MAX)) as i32).to_le_bytes()),
        }
    }
}
