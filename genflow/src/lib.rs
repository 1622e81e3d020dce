//! # Genflow
//!
//! Execution engine for node-based AI content generation pipelines.
//!
//! A pipeline is a graph of typed nodes (text prompts, style settings,
//! prompt enhancers, image and video generators, overlays, previews and
//! exports) joined by edges between typed ports. Genflow provides:
//!
//! - **Graph validation**: port-type compatibility and edge checks on load
//! - **Scheduling**: a dependency-respecting order with cycle detection
//! - **Execution**: fail-fast full runs and single-node re-runs, with
//!   per-node state and stale marking of downstream results
//! - **Generation backends**: a remote HTTP node API, or in-process
//!   generation against DashScope with task polling
//! - **Cancellation** and **events** for hosts that drive runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genflow::prelude::*;
//!
//! let graph = templates::by_id("ai-pet").unwrap().graph()?;
//! let executor = HttpNodeExecutor::from_config(&GenflowConfig::from_env()?)?;
//! let runner = PipelineRunner::new(Arc::new(executor), Arc::new(ExecutionStore::new()));
//!
//! let result = runner.run_pipeline(&graph).await?;
//! println!("success: {}", result.success);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
#[cfg(feature = "http")]
pub mod dashscope;
pub mod errors;
pub mod events;
pub mod executor;
pub mod graph;
pub mod jobs;
pub mod output;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod state;
pub mod templates;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{DashScopeConfig, GenflowConfig};
    #[cfg(feature = "http")]
    pub use crate::dashscope::DashScopeClient;
    pub use crate::errors::{
        ConfigError, CycleDetectedError, EdgeRejection, ExecutionError, GenflowError, GraphError, PipelineError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    #[cfg(feature = "http")]
    pub use crate::executor::HttpNodeExecutor;
    pub use crate::executor::{GenerationService, NodeExecutor, NodeRunResponse, ServiceNodeExecutor};
    pub use crate::graph::{Edge, Node, NodeConfig, NodeKind, PipelineGraph, Position, RunnableNode};
    pub use crate::jobs::{JobPoller, PollPolicy, TaskApi, TaskSnapshot, TaskStatus};
    pub use crate::output::NodeOutput;
    pub use crate::pipeline::{PipelineRunResult, PipelineRunner};
    pub use crate::ports::{is_connection_valid, PortType};
    pub use crate::registry::{RunRecord, RunRegistry, RunStatus};
    pub use crate::state::{ExecutionStatus, ExecutionStore, NodeExecutionState};
    pub use crate::templates;
    pub use crate::utils::{generate_run_id, iso_timestamp, now_millis};
}
