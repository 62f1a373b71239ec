//! Core engine: edge computation and the tick cycle that publishes it.

pub mod edge;
pub mod orchestrator;
pub mod report;

pub use orchestrator::TickOrchestrator;
pub use report::{CycleReport, SourceReport, SourceStatus};
