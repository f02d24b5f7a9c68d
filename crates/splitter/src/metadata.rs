//! Metadata propagation engine.
//!
//! Routes every event of the input frame to the active output ports, in
//! order. The first accepting port receives the event itself; each later
//! accepting port receives a duplicate obtained from the handler. An event
//! nobody accepts is handed back to the handler as dropped.

use contracts::{CloneFailure, MetadataEvent, MetadataHandler, StreamFrame};
use tracing::{debug, warn};

use crate::policy::{is_blocked, PortPolicyTable};
use crate::port::OutputPort;

/// Result of one propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PropagationOutcome {
    pub transferred: u32,
    pub cloned: u32,
    pub dropped: u32,
    /// Events appended per port index
    pub events_per_port: Vec<usize>,
    pub clone_failures: Vec<CloneFailure>,
}

impl PropagationOutcome {
    fn new(port_count: usize) -> Self {
        Self {
            events_per_port: vec![0; port_count],
            ..Default::default()
        }
    }
}

/// Drain `input.metadata` into the output frames
pub(crate) fn propagate_metadata<H: MetadataHandler>(
    input: &mut StreamFrame,
    ports: &[OutputPort],
    outputs: &mut [Option<StreamFrame>],
    table: Option<&PortPolicyTable>,
    handler: &mut H,
) -> PropagationOutcome {
    let mut outcome = PropagationOutcome::new(ports.len());

    for event in input.metadata.take() {
        propagate_event(event, ports, outputs, table, handler, &mut outcome);
    }

    input.flags.marker_eos = false;
    outcome
}

fn propagate_event<H: MetadataHandler>(
    mut event: MetadataEvent,
    ports: &[OutputPort],
    outputs: &mut [Option<StreamFrame>],
    table: Option<&PortPolicyTable>,
    handler: &mut H,
    outcome: &mut PropagationOutcome,
) {
    let id = event.id();
    let eos = event.eos_flags();
    if let Some(flags) = eos {
        debug!(
            metadata_id = %id,
            flushing = flags.flushing,
            internal = flags.internal,
            out_of_band = event.is_out_of_band(),
            "eos classified"
        );
    }

    // (port index, internal flag to apply for EOS)
    let mut first_acceptor: Option<(usize, Option<bool>)> = None;

    for (index, port) in ports.iter().enumerate() {
        let Some(frame) = outputs.get_mut(index).and_then(Option::as_mut) else {
            continue;
        };
        if !port.is_active(Some(&*frame)) {
            continue;
        }

        if eos.is_some_and(|flags| flags.flushing) {
            frame.flags.marker_eos = true;
        }

        // EOS is always forwarded; only its visibility depends on the port
        let internal = match eos {
            Some(flags) => {
                let internal = flags.internal || !port.eos_passthrough;
                if internal != flags.internal {
                    debug!(port_index = index, port_id = %port.id, "eos re-marked internal");
                }
                Some(internal)
            }
            None if is_blocked(table, port, id) => continue,
            None => None,
        };

        if first_acceptor.is_none() {
            first_acceptor = Some((index, internal));
            continue;
        }

        match handler.clone_event(&event) {
            Ok(mut duplicate) => {
                if let Some(internal) = internal {
                    duplicate.set_eos_internal(internal);
                }
                frame.metadata.push(duplicate);
                outcome.cloned += 1;
                outcome.events_per_port[index] += 1;
            }
            Err(err) => {
                warn!(
                    metadata_id = %id,
                    port_index = index,
                    error = %err,
                    "metadata clone failed, skipping remaining ports"
                );
                outcome.clone_failures.push(CloneFailure {
                    metadata_id: id,
                    port_index: index,
                    message: err.to_string(),
                });
                break;
            }
        }
    }

    let target = first_acceptor.and_then(|(index, internal)| {
        outputs
            .get_mut(index)
            .and_then(Option::as_mut)
            .map(|frame| (index, internal, frame))
    });

    match target {
        Some((index, internal, frame)) => {
            if let Some(internal) = internal {
                event.set_eos_internal(internal);
            }
            frame.metadata.push(event);
            outcome.transferred += 1;
            outcome.events_per_port[index] += 1;
        }
        None => {
            handler.destroy(event, true);
            outcome.dropped += 1;
        }
    }
}
