//! Per-node execution state.

mod status;
mod store;

pub use status::{ExecutionStatus, NodeExecutionState, NodeStateUpdate};
pub use store::ExecutionStore;
