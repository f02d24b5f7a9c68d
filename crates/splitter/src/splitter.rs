//! Splitter module façade.

use contracts::{
    FrameReport, LatchedTimestamp, MediaFormat, MetadataHandler, MetadataId,
    MetadataPropagationConfig, PortState, SplitterBlueprint, StreamFrame, TsPropagation,
};
use serde::Serialize;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::fanout::fan_out_samples;
use crate::handler::HeapMetadataHandler;
use crate::metadata::propagate_metadata;
use crate::policy::{is_blocked, PortPolicyTable};
use crate::port::OutputPort;
use crate::SplitterError;

/// Cumulative counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitterStats {
    pub frames_processed: u64,
    pub degraded_frames: u64,
    pub metadata_transferred: u64,
    pub metadata_cloned: u64,
    pub metadata_dropped: u64,
    pub clone_failures: u64,
    pub bytes_delivered: u64,
}

/// One input, N outputs
#[derive(Debug)]
pub struct Splitter<H: MetadataHandler = HeapMetadataHandler> {
    ports: Vec<OutputPort>,
    policy: Option<PortPolicyTable>,
    media_format: Option<MediaFormat>,
    latched: Option<LatchedTimestamp>,
    handler: H,
    stats: SplitterStats,
}

impl<H: MetadataHandler> Splitter<H> {
    /// Create a splitter with no media format and no policy table
    pub fn new(ports: Vec<OutputPort>, handler: H) -> Self {
        Self {
            ports,
            policy: None,
            media_format: None,
            latched: None,
            handler,
            stats: SplitterStats::default(),
        }
    }

    /// Establish the input media format
    pub fn set_input_media_format(&mut self, format: MediaFormat) -> Result<(), SplitterError> {
        format
            .validate()
            .map_err(|e| SplitterError::invalid_media_format(e.to_string()))?;

        if !matches!(format.bits_per_sample, 16 | 24 | 32) {
            return Err(SplitterError::invalid_media_format(format!(
                "unsupported bits per sample: {}",
                format.bits_per_sample
            )));
        }

        debug!(
            sample_rate = format.sample_rate,
            channels = format.num_channels,
            layout = ?format.layout,
            "input media format set"
        );
        self.media_format = Some(format);
        Ok(())
    }

    pub fn media_format(&self) -> Option<&MediaFormat> {
        self.media_format.as_ref()
    }

    /// Install the per-port allow-lists, replacing any previous table
    #[instrument(
        name = "splitter_install_policy",
        skip(self, config),
        fields(entries = config.ports.len())
    )]
    pub fn install_policy(&mut self, config: &MetadataPropagationConfig) {
        let table = PortPolicyTable::from_config(config);
        for port in &mut self.ports {
            port.refresh_eos_passthrough(Some(&table));
        }
        info!(ports = table.len(), "metadata policy installed");
        self.policy = Some(table);
    }

    /// Remove the table: custom metadata blocked, EOS passthrough restored
    pub fn clear_policy(&mut self) {
        self.policy = None;
        for port in &mut self.ports {
            port.refresh_eos_passthrough(None);
        }
    }

    pub fn policy(&self) -> Option<&PortPolicyTable> {
        self.policy.as_ref()
    }

    pub fn set_port_state(&mut self, index: usize, state: PortState) -> Result<(), SplitterError> {
        let port = self.port_mut(index)?;
        port.state = state;
        let port_id = port.id;

        debug!(port_index = index, port_id = %port_id, ?state, "port state changed");
        observability::record_port_state_change(port_id.0, state_label(state));
        Ok(())
    }

    pub fn set_ts_propagation(
        &mut self,
        index: usize,
        mode: TsPropagation,
    ) -> Result<(), SplitterError> {
        self.port_mut(index)?.ts_propagation = mode;
        Ok(())
    }

    pub fn set_all_metadata_blocked(
        &mut self,
        index: usize,
        blocked: bool,
    ) -> Result<(), SplitterError> {
        self.port_mut(index)?.all_metadata_blocked = blocked;
        Ok(())
    }

    pub fn latch_timestamp(&mut self, latched: LatchedTimestamp) {
        self.latched = Some(latched);
    }

    pub fn clear_latched_timestamp(&mut self) {
        self.latched = None;
    }

    /// Whether a non-EOS event with `id` would be withheld from port `index`
    pub fn is_metadata_blocked(&self, index: usize, id: MetadataId) -> Result<bool, SplitterError> {
        let port = self.port(index)?;
        Ok(is_blocked(self.policy.as_ref(), port, id))
    }

    pub fn ports(&self) -> &[OutputPort] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Result<&OutputPort, SplitterError> {
        let count = self.ports.len();
        self.ports
            .get(index)
            .ok_or(SplitterError::PortIndexOutOfRange { index, count })
    }

    fn port_mut(&mut self, index: usize) -> Result<&mut OutputPort, SplitterError> {
        let count = self.ports.len();
        self.ports
            .get_mut(index)
            .ok_or(SplitterError::PortIndexOutOfRange { index, count })
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handler access for the host, e.g. to release consumed output events
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn stats(&self) -> SplitterStats {
        self.stats
    }

    /// Process one frame: route metadata, then fan out samples
    ///
    /// `outputs[i]` is the frame bound to port `i`, if any.
    ///
    /// # Errors
    /// Precondition failures leave every frame untouched. Lost metadata
    /// duplicates do not fail the call; they are listed in the report.
    #[instrument(
        level = "debug",
        name = "splitter_process",
        skip(self, input, outputs),
        fields(outputs = outputs.len(), metadata = input.metadata.len())
    )]
    pub fn process(
        &mut self,
        input: &mut StreamFrame,
        outputs: &mut [Option<StreamFrame>],
    ) -> Result<FrameReport, SplitterError> {
        let format = self.media_format.ok_or(SplitterError::MediaFormatNotSet)?;

        if !matches!(outputs.first(), Some(Some(_))) {
            return Err(SplitterError::MissingOutput);
        }
        if input.buffers.is_empty() {
            return Err(SplitterError::invalid_source("no channel buffers"));
        }
        if input.buffers.len() != format.buffers_per_frame() {
            return Err(SplitterError::invalid_source(format!(
                "expected {} channel buffers, got {}",
                format.buffers_per_frame(),
                input.buffers.len()
            )));
        }

        let outcome = propagate_metadata(
            input,
            &self.ports,
            outputs,
            self.policy.as_ref(),
            &mut self.handler,
        );
        let mut deliveries = fan_out_samples(input, &format, &self.ports, outputs, self.latched);
        for delivery in &mut deliveries {
            delivery.metadata_events = outcome
                .events_per_port
                .get(delivery.port_index)
                .copied()
                .unwrap_or_default();
        }

        let report = FrameReport {
            deliveries,
            metadata_transferred: outcome.transferred,
            metadata_cloned: outcome.cloned,
            metadata_dropped: outcome.dropped,
            clone_failures: outcome.clone_failures,
        };

        self.update_stats(&report);
        observability::record_frame_metrics(&report);
        for failure in &report.clone_failures {
            observability::record_clone_failure(failure.metadata_id.0, failure.port_index);
        }

        Ok(report)
    }

    fn update_stats(&mut self, report: &FrameReport) {
        let stats = &mut self.stats;
        stats.frames_processed += 1;
        if !report.clone_failures.is_empty() {
            stats.degraded_frames += 1;
        }
        stats.metadata_transferred += u64::from(report.metadata_transferred);
        stats.metadata_cloned += u64::from(report.metadata_cloned);
        stats.metadata_dropped += u64::from(report.metadata_dropped);
        stats.clone_failures += report.clone_failures.len() as u64;
        stats.bytes_delivered += report.bytes_delivered() as u64;
    }
}

impl Splitter<HeapMetadataHandler> {
    /// Build from a loaded blueprint with the default heap handler
    pub fn from_blueprint(blueprint: &SplitterBlueprint) -> Result<Self, SplitterError> {
        Self::from_blueprint_with_handler(blueprint, HeapMetadataHandler::new())
    }
}

impl<H: MetadataHandler> Splitter<H> {
    pub fn from_blueprint_with_handler(
        blueprint: &SplitterBlueprint,
        handler: H,
    ) -> Result<Self, SplitterError> {
        let ports = blueprint.ports.iter().map(OutputPort::from).collect();
        let mut splitter = Self::new(ports, handler);

        splitter.set_input_media_format(blueprint.media_format)?;
        if let Some(config) = &blueprint.metadata_propagation {
            splitter.install_policy(config);
        }
        Ok(splitter)
    }
}

fn state_label(state: PortState) -> &'static str {
    match state {
        PortState::Inactive => "inactive",
        PortState::Started => "started",
        PortState::Closed => "closed",
    }
}
