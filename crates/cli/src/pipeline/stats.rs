//! Simulation statistics.

use std::time::Duration;

use contracts::{FrameReport, FrameStatus};
use observability::FrameMetricsAggregator;
use splitter::SplitterStats;

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames passed through the splitter
    pub frames_processed: u64,

    /// Frames that lost at least one metadata duplicate
    pub frames_degraded: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Splitter counters at the end of the run
    pub splitter: SplitterStats,

    /// Events handed back to the metadata handler
    pub metadata_released: u64,

    /// Per-frame report aggregator
    pub metrics: FrameMetricsAggregator,
}

impl PipelineStats {
    /// Account one frame report
    pub fn record(&mut self, report: &FrameReport) {
        self.frames_processed += 1;
        if report.status() == FrameStatus::Degraded {
            self.frames_degraded += 1;
        }
        self.metrics.update(report);
    }

    /// Frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Simulation Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames processed: {}", self.frames_processed);
        println!("   ├─ Frames degraded: {}", self.frames_degraded);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Bytes delivered: {}", self.splitter.bytes_delivered);

        println!("\nMetadata");
        println!("   ├─ Transferred: {}", self.splitter.metadata_transferred);
        println!("   ├─ Cloned: {}", self.splitter.metadata_cloned);
        println!("   ├─ Dropped: {}", self.splitter.metadata_dropped);
        println!("   ├─ Released by handler: {}", self.metadata_released);
        println!("   └─ Clone failures: {}", self.splitter.clone_failures);

        let summary = self.metrics.summary();
        if !summary.port_bytes.is_empty() {
            println!("\nPorts");
            for (port, bytes) in &summary.port_bytes {
                let events = summary.port_metadata.get(port).copied().unwrap_or(0);
                println!("   ├─ port {port}: bytes/frame {bytes}, metadata {events}");
            }
        }

        println!();
    }
}
