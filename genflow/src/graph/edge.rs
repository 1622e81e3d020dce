//! Directed connections between node ports.

use serde::{Deserialize, Serialize};

/// A directed connection from a source node's output port to a target
/// node's input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Edge identifier.
    #[serde(default)]
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Output port on the source node.
    #[serde(default)]
    pub source_handle: Option<String>,
    /// Target node id.
    pub target: String,
    /// Input port on the target node.
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates an edge between two ports, deriving its id from the endpoints.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let source_handle = source_handle.into();
        let target = target.into();
        let target_handle = target_handle.into();
        Self {
            id: format!("e-{source}.{source_handle}-{target}.{target_handle}"),
            source,
            source_handle: Some(source_handle),
            target,
            target_handle: Some(target_handle),
        }
    }

    /// Overrides the edge id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
