//! Simulation driving the splitter frame by frame.

mod source;
mod simulation;
mod stats;

pub use simulation::{Simulation, SimulationRun};
pub use stats::PipelineStats;
