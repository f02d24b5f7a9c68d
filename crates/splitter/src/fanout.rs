//! Sample fan-out engine.

use contracts::{LatchedTimestamp, MediaFormat, PortDelivery, StreamFrame, TsPropagation};
use tracing::trace;

use crate::port::OutputPort;

/// Copy (or forward in place) the input samples to every active port
///
/// Must run after metadata propagation so each port's `marker_eos` is final.
pub(crate) fn fan_out_samples(
    input: &mut StreamFrame,
    format: &MediaFormat,
    ports: &[OutputPort],
    outputs: &mut [Option<StreamFrame>],
    latched: Option<LatchedTimestamp>,
) -> Vec<PortDelivery> {
    let mut deliveries = Vec::new();
    let per_channel = format.records_length_per_channel();

    for (index, port) in ports.iter().enumerate() {
        let Some(frame) = outputs.get_mut(index).and_then(Option::as_mut) else {
            continue;
        };
        if !port.is_active(Some(&*frame)) {
            continue;
        }

        frame.flags.merge_preserving_eos(&input.flags);
        apply_timestamp(frame, input, port.ts_propagation, latched);

        let in_place = copy_channels(input, frame, per_channel);
        trace!(
            port_index = index,
            port_id = %port.id,
            bytes = frame.actual_len(),
            in_place,
            "port filled"
        );

        deliveries.push(PortDelivery {
            port_index: index,
            port_id: port.id,
            bytes: frame.actual_len(),
            in_place,
            metadata_events: 0,
            marker_eos: frame.flags.marker_eos,
        });
    }

    input.flags.end_of_frame = false;
    deliveries
}

fn apply_timestamp(
    frame: &mut StreamFrame,
    input: &StreamFrame,
    mode: TsPropagation,
    latched: Option<LatchedTimestamp>,
) {
    match mode {
        TsPropagation::Source => {
            frame.timestamp_us = input.timestamp_us;
            frame.flags.timestamp_valid = input.flags.timestamp_valid;
        }
        TsPropagation::Latched => match latched {
            Some(latched) => {
                frame.timestamp_us = latched.timestamp_us;
                frame.flags.timestamp_valid = latched.valid;
            }
            None => frame.flags.timestamp_valid = false,
        },
        TsPropagation::Invalid => frame.flags.timestamp_valid = false,
    }
}

/// Returns whether any channel was forwarded in place
fn copy_channels(input: &StreamFrame, frame: &mut StreamFrame, per_channel: bool) -> bool {
    // Unpacked layouts record one length, on the first buffer
    let shared_len = input.actual_len();
    let mut in_place = false;

    for (channel, (dst, src)) in frame.buffers.iter_mut().zip(&input.buffers).enumerate() {
        let data = if per_channel {
            src.data()
        } else {
            let raw = src.raw();
            &raw[..shared_len.min(raw.len())]
        };

        let len = if dst.same_memory(src) {
            in_place = true;
            data.len().min(dst.max_len())
        } else {
            dst.write(data)
        };

        if per_channel || channel == 0 {
            dst.set_actual_len(len);
        }
    }

    in_place
}
