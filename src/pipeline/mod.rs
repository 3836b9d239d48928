//! Layered validation pipeline.
//!
//! Requests flow through the cheapest layer that can answer them: exact
//! cache, static rules, similarity cache, then a paid model. Statistics
//! record which layer settled each request.

pub mod orchestrator;
pub mod stats;

pub use orchestrator::{
    DirectoryReport, SweepStatus, ValidationOrchestrator, DEFAULT_SIMILARITY_THRESHOLD,
    HARD_FAILURE_CONFIDENCE,
};
pub use stats::{ModelUsage, Resolution, ValidationStats};
