//! Simulation runner - feeds generated frames through the splitter.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    ChannelBuffer, FrameStatus, LatchedTimestamp, MetadataHandler, PortId, SplitterBlueprint,
    StreamFrame,
};
use splitter::Splitter;
use tracing::{debug, info, warn};

use super::source::FrameSource;
use super::PipelineStats;
use crate::error::CliError;

const DEFAULT_FRAMES: u64 = 100;
const DEFAULT_FRAME_DURATION_MS: u32 = 10;

/// Run parameters
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// Loaded configuration
    pub blueprint: SplitterBlueprint,

    /// Frame count override (None = script, then default)
    pub frames: Option<u64>,

    /// Pace frames at the frame duration
    pub realtime: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Drives one splitter through a scripted run
pub struct Simulation {
    run: SimulationRun,
}

impl Simulation {
    pub fn new(run: SimulationRun) -> Self {
        Self { run }
    }

    /// Run every frame to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.run.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let blueprint = &self.run.blueprint;
        let script = blueprint.simulation.as_ref();

        let frames = self
            .run
            .frames
            .or(script.map(|s| s.frames))
            .unwrap_or(DEFAULT_FRAMES);
        let frame_duration_ms = script.map_or(DEFAULT_FRAME_DURATION_MS, |s| s.frame_duration_ms);
        let clock_offset_us = script.map_or(0, |s| s.latched_clock_offset_us);
        let in_place_port = script.and_then(|s| s.in_place_port);

        let mut splitter =
            Splitter::from_blueprint(blueprint).context("Failed to build splitter")?;
        let source = FrameSource::new(blueprint.media_format, frame_duration_ms);

        let metadata = group_by_frame(script.map(|s| s.metadata.as_slice()), |m| m.frame());
        let port_changes = group_by_frame(script.map(|s| s.port_changes.as_slice()), |c| c.frame);

        info!(
            frames,
            frame_duration_ms,
            ports = splitter.ports().len(),
            scripted_metadata = metadata.values().map(Vec::len).sum::<usize>(),
            realtime = self.run.realtime,
            "Simulation starting"
        );

        let mut interval = self
            .run
            .realtime
            .then(|| tokio::time::interval(Duration::from_millis(frame_duration_ms.into())));
        let mut stats = PipelineStats::default();

        for index in 0..frames {
            if let Some(interval) = interval.as_mut() {
                interval.tick().await;
            }

            for change in port_changes.get(&index).into_iter().flatten() {
                let port_index = splitter
                    .ports()
                    .iter()
                    .position(|p| p.id == change.port_id)
                    .ok_or_else(|| {
                        CliError::simulation(format!("unknown port {}", change.port_id))
                    })?;
                splitter
                    .set_port_state(port_index, change.state)
                    .map_err(CliError::from)?;
            }

            let mut input = source.frame(index);
            for scripted in metadata.get(&index).into_iter().flatten() {
                input
                    .metadata
                    .push(scripted.to_event().map_err(CliError::from)?);
            }
            input.flags.marker_eos = input
                .metadata
                .iter()
                .any(|e| e.eos_flags().is_some_and(|f| f.flushing));

            splitter.latch_timestamp(LatchedTimestamp {
                timestamp_us: input.timestamp_us + clock_offset_us,
                valid: true,
            });

            let mut outputs = build_outputs(blueprint, &source, &input, in_place_port);
            let report = splitter
                .process(&mut input, &mut outputs)
                .with_context(|| format!("Frame {index} failed"))?;

            if report.status() == FrameStatus::Degraded {
                warn!(
                    frame = index,
                    failures = report.clone_failures.len(),
                    "Frame degraded, metadata duplicates lost"
                );
            }
            debug!(
                frame = index,
                ports = report.deliveries.len(),
                bytes = report.bytes_delivered(),
                "Frame processed"
            );

            stats.record(&report);

            // Downstream consumes every delivered event
            for output in outputs.iter_mut().flatten() {
                for event in output.metadata.take() {
                    splitter.handler_mut().destroy(event, false);
                }
            }
        }

        stats.duration = start_time.elapsed();
        stats.splitter = splitter.stats();
        stats.metadata_released = splitter.handler().released();

        Ok(stats)
    }
}

fn group_by_frame<T>(items: Option<&[T]>, frame: impl Fn(&T) -> u64) -> BTreeMap<u64, Vec<&T>> {
    let mut grouped: BTreeMap<u64, Vec<&T>> = BTreeMap::new();
    for item in items.unwrap_or_default() {
        grouped.entry(frame(item)).or_default().push(item);
    }
    grouped
}

/// One output frame per configured port; the in-place port aliases the input
fn build_outputs(
    blueprint: &SplitterBlueprint,
    source: &FrameSource,
    input: &StreamFrame,
    in_place_port: Option<PortId>,
) -> Vec<Option<StreamFrame>> {
    let buffers = blueprint.media_format.buffers_per_frame();

    blueprint
        .ports
        .iter()
        .map(|port| {
            let capacity = port
                .capacity_bytes
                .unwrap_or_else(|| source.bytes_per_buffer());

            let aliased = (in_place_port == Some(port.port_id))
                .then(|| {
                    input
                        .buffers
                        .iter()
                        .map(|b| ChannelBuffer::aliasing(b).map(|a| a.limit_capacity(capacity)))
                        .collect::<Option<Vec<_>>>()
                })
                .flatten();

            // Owned input memory cannot be aliased; such a port gets a copy
            let frame = match aliased {
                Some(alias) => StreamFrame::with_buffers(alias),
                None => StreamFrame::output(buffers, capacity),
            };
            Some(frame)
        })
        .collect()
}
