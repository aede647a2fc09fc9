//! Human-in-the-loop review workflow.

mod assignment;
mod engine;

pub use assignment::{AssignmentPolicy, ConfiguredAssignment};
pub use engine::ReviewEngine;
