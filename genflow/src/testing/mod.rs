//! Testing utilities for genflow pipelines.
//!
//! This module provides:
//! - A recording [`MockExecutor`] and a [`ScriptedGenerationService`]
//! - Node and graph fixtures
//! - A [`StubServer`] for exercising HTTP clients without a network

pub mod fixtures;
mod http_stub;
mod mocks;

pub use http_stub::{CapturedRequest, StubServer};
pub use mocks::{ExecutorCall, MockExecutor, ScriptedGenerationService};
