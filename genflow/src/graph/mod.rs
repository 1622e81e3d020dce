//! The pipeline graph model.
//!
//! A [`PipelineGraph`] owns the nodes and the accepted edges of one pipeline.
//! Edges are checked against the port schemas on entry; invalid edges are
//! discarded and reported rather than failing the whole graph. Duplicate
//! node ids are fatal. Cycles are allowed here and rejected by the scheduler.

pub mod configs;
mod edge;
mod node;
mod schema;

pub use configs::*;
pub use edge::Edge;
pub use node::{Node, NodeConfig, NodeKind, Position, RunnableNode};
pub use schema::schema_for;

use crate::errors::{CycleDetectedError, EdgeRejection, GraphError};
use crate::pipeline::scheduler::topological_sort;
use crate::ports::PortType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Checks whether an edge between two node kinds' ports is allowed.
///
/// Both handles must exist on their node's schema and the port types must
/// satisfy the compatibility matrix.
pub fn check_connection(
    source_kind: NodeKind,
    source_handle: &str,
    target_kind: NodeKind,
    target_handle: &str,
) -> Result<(PortType, PortType), EdgeRejection> {
    let source_port = source_kind
        .schema()
        .output(source_handle)
        .ok_or_else(|| EdgeRejection::UnknownSourcePort {
            kind: source_kind,
            handle: source_handle.to_string(),
        })?;
    let target_port = target_kind
        .schema()
        .input(target_handle)
        .ok_or_else(|| EdgeRejection::UnknownTargetPort {
            kind: target_kind,
            handle: target_handle.to_string(),
        })?;

    if !source_port.port_type.can_connect_to(target_port.port_type) {
        return Err(EdgeRejection::IncompatibleTypes {
            source_type: source_port.port_type,
            target_type: target_port.port_type,
        });
    }
    Ok((source_port.port_type, target_port.port_type))
}

/// Returns true if an edge between the given kinds' ports is allowed.
#[must_use]
pub fn validate_connection(
    source_kind: NodeKind,
    source_handle: &str,
    target_kind: NodeKind,
    target_handle: &str,
) -> bool {
    check_connection(source_kind, source_handle, target_kind, target_handle).is_ok()
}

/// An edge refused during graph construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedEdge {
    /// The refused edge.
    pub edge: Edge,
    /// Why it was refused.
    pub reason: EdgeRejection,
}

/// The serialized form of a pipeline: nodes and edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Nodes in canvas order.
    pub nodes: Vec<Node>,
    /// Edges in canvas order.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A validated pipeline graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "PipelineDefinition")]
pub struct PipelineGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    discarded: Vec<DiscardedEdge>,
}

impl TryFrom<PipelineDefinition> for PipelineGraph {
    type Error = GraphError;

    fn try_from(definition: PipelineDefinition) -> Result<Self, Self::Error> {
        Self::new(definition.nodes, definition.edges)
    }
}

impl PipelineGraph {
    /// Builds a graph, discarding edges that fail validation.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if two nodes share an id.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut graph = Self {
            nodes,
            edges: Vec::with_capacity(edges.len()),
            discarded: Vec::new(),
        };
        for edge in edges {
            if let Err(reason) = graph.connect(edge.clone()) {
                warn!(edge_id = %edge.id, %reason, "Discarding invalid edge");
                graph.discarded.push(DiscardedEdge { edge, reason });
            }
        }
        Ok(graph)
    }

    /// Parses a graph from its JSON definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or node ids collide.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let definition: PipelineDefinition = serde_json::from_str(json)?;
        Self::new(definition.nodes, definition.edges)
    }

    /// Serializes the graph's nodes and accepted edges as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Nodes in canvas order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Accepted edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges refused during construction.
    #[must_use]
    pub fn discarded(&self) -> &[DiscardedEdge] {
        &self.discarded
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of accepted edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if the id is taken.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node(&node.id).is_some() {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(self.nodes.remove(index))
    }

    /// Checks an edge against the current graph without adding it.
    pub fn check_edge(&self, edge: &Edge) -> Result<(), EdgeRejection> {
        let (Some(source_handle), Some(target_handle)) = (&edge.source_handle, &edge.target_handle) else {
            return Err(EdgeRejection::MissingHandle);
        };
        let source = self
            .node(&edge.source)
            .ok_or_else(|| EdgeRejection::UnknownNode(edge.source.clone()))?;
        let target = self
            .node(&edge.target)
            .ok_or_else(|| EdgeRejection::UnknownNode(edge.target.clone()))?;
        if source.id == target.id {
            return Err(EdgeRejection::SelfLoop(source.id.clone()));
        }

        check_connection(source.kind(), source_handle, target.kind(), target_handle)?;

        let occupied = self
            .edges
            .iter()
            .any(|e| e.target == edge.target && e.target_handle.as_deref() == Some(target_handle.as_str()));
        if occupied {
            return Err(EdgeRejection::TargetPortOccupied {
                node_id: edge.target.clone(),
                port: target_handle.clone(),
            });
        }
        Ok(())
    }

    /// Validates and adds an edge.
    pub fn connect(&mut self, edge: Edge) -> Result<(), EdgeRejection> {
        self.check_edge(&edge)?;
        self.edges.push(edge);
        Ok(())
    }

    /// Removes an edge by id.
    pub fn disconnect(&mut self, edge_id: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(index))
    }

    /// Ids of nodes with an edge into `id`.
    #[must_use]
    pub fn upstream_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Ids of nodes with an edge out of `id`.
    #[must_use]
    pub fn downstream_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Computes a dependency-respecting execution order.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetectedError`] if the graph is not a DAG.
    pub fn execution_order(&self) -> Result<Vec<String>, CycleDetectedError> {
        topological_sort(&self.nodes, &self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_connection_by_schema() {
        assert!(validate_connection(NodeKind::TextPrompt, "text", NodeKind::PromptEnhancer, "text"));
        assert!(validate_connection(NodeKind::ImageGenerator, "image", NodeKind::Preview, "media"));
        assert!(!validate_connection(NodeKind::Preview, "media", NodeKind::ImageGenerator, "image"));
        assert!(!validate_connection(NodeKind::TextPrompt, "text", NodeKind::ImageGenerator, "prompt"));
    }

    #[test]
    fn test_unknown_handle_is_rejected() {
        let err = check_connection(NodeKind::TextPrompt, "caption", NodeKind::PromptEnhancer, "text").unwrap_err();
        assert!(matches!(err, EdgeRejection::UnknownSourcePort { .. }));

        let err = check_connection(NodeKind::TextPrompt, "text", NodeKind::PromptEnhancer, "seed").unwrap_err();
        assert!(matches!(err, EdgeRejection::UnknownTargetPort { .. }));
    }

    #[test]
    fn test_duplicate_node_id_is_fatal() {
        let nodes = vec![fixtures::text_prompt("a", "x"), fixtures::text_prompt("a", "y")];
        let err = PipelineGraph::new(nodes, vec![]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(id) if id == "a"));
    }

    #[test]
    fn test_invalid_edges_are_discarded() {
        let nodes = vec![
            fixtures::text_prompt("txt1", "cat"),
            fixtures::prompt_enhancer("pe1"),
            fixtures::image_generator("ig1"),
        ];
        let edges = vec![
            Edge::new("txt1", "text", "pe1", "text"),
            Edge::new("txt1", "text", "ig1", "prompt"),
            Edge::new("pe1", "prompt", "ghost", "prompt"),
            Edge::new("pe1", "prompt", "pe1", "text"),
            Edge {
                target_handle: None,
                ..Edge::new("pe1", "prompt", "ig1", "prompt")
            },
        ];

        let graph = PipelineGraph::new(nodes, edges).unwrap();
        assert_eq!(graph.edge_count(), 1);
        let reasons: Vec<_> = graph.discarded().iter().map(|d| d.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                EdgeRejection::IncompatibleTypes {
                    source_type: PortType::Text,
                    target_type: PortType::Prompt,
                },
                EdgeRejection::UnknownNode("ghost".to_string()),
                EdgeRejection::SelfLoop("pe1".to_string()),
                EdgeRejection::MissingHandle,
            ]
        );
    }

    #[test]
    fn test_input_port_accepts_one_edge() {
        let mut graph = PipelineGraph::new(
            vec![
                fixtures::text_prompt("a", "one"),
                fixtures::text_prompt("b", "two"),
                fixtures::prompt_enhancer("pe1"),
            ],
            vec![Edge::new("a", "text", "pe1", "text")],
        )
        .unwrap();

        let err = graph.connect(Edge::new("b", "text", "pe1", "text")).unwrap_err();
        assert!(matches!(err, EdgeRejection::TargetPortOccupied { .. }));
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = fixtures::linear_chain();
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.remove_node("B").is_some());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node("B").is_none());
    }

    #[test]
    fn test_json_round_trip_keeps_accepted_edges() {
        let graph = fixtures::linear_chain();
        let json = graph.to_json().unwrap();
        let back = PipelineGraph::from_json(&json).unwrap();
        assert_eq!(back.nodes(), graph.nodes());
        assert_eq!(back.edges(), graph.edges());
    }

    #[test]
    fn test_neighbours() {
        let graph = fixtures::linear_chain();
        assert_eq!(graph.upstream_of("B"), vec!["A"]);
        assert_eq!(graph.downstream_of("B"), vec!["C"]);
        assert!(graph.upstream_of("A").is_empty());
    }
}
