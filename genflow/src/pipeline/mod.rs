//! Pipeline execution.
//!
//! This module provides:
//! - Topological scheduling with cycle detection
//! - Input collection along edges
//! - The [`PipelineRunner`] for full and single-node runs

pub mod collector;
pub mod result;
pub mod runner;
pub mod scheduler;


pub use collector::{collect_inputs, first_input, missing_required_inputs, NodeInputs, OutputMap};
pub use result::PipelineRunResult;
pub use runner::PipelineRunner;
pub use scheduler::topological_sort;
