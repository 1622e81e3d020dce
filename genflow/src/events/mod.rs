//! Execution events.
//!
//! Event types emitted by the engine:
//!
//! | Event | Emitted by |
//! |-------|------------|
//! | `pipeline.started` / `pipeline.completed` / `pipeline.failed` | runner |
//! | `node.started` / `node.completed` / `node.failed` | runner |
//! | `node.state_changed` | execution store |
//! | `node.stale` | execution store |

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use std::sync::Arc;

/// Returns a shared no-op sink.
#[must_use]
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpEventSink)
}
