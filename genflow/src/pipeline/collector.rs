//! Input collection for a node about to execute.

use crate::graph::{Edge, NodeKind};
use crate::output::NodeOutput;
use std::collections::HashMap;

/// Outputs produced so far in a run, keyed by node id.
pub type OutputMap = HashMap<String, NodeOutput>;

/// Inputs delivered to a node, keyed by target port id.
pub type NodeInputs = HashMap<String, NodeOutput>;

/// Gathers the inputs of `node_id` from upstream outputs.
///
/// For every edge targeting the node whose source has an output in
/// `outputs`, the output is stored under the edge's target handle. Edges
/// are visited in list order, so a later edge into the same port wins.
/// Sources without an output and edges without a target handle are skipped
/// silently.
#[must_use]
pub fn collect_inputs(node_id: &str, edges: &[Edge], outputs: &OutputMap) -> NodeInputs {
    let mut inputs = NodeInputs::new();
    for edge in edges.iter().filter(|e| e.target == node_id) {
        if let (Some(handle), Some(output)) = (edge.target_handle.as_deref(), outputs.get(&edge.source)) {
            inputs.insert(handle.to_string(), output.clone());
        }
    }
    inputs
}

/// Required input ports of `kind` that have no value in `inputs`.
#[must_use]
pub fn missing_required_inputs(kind: NodeKind, inputs: &NodeInputs) -> Vec<&'static str> {
    kind.schema()
        .required_inputs()
        .filter(|port| !inputs.contains_key(port.id))
        .map(|port| port.id)
        .collect()
}

/// The first collected input in the kind's input-port declaration order.
///
/// Forwarding nodes pass this value through as their own output.
#[must_use]
pub fn first_input(kind: NodeKind, inputs: &NodeInputs) -> Option<&NodeOutput> {
    kind.schema().inputs.iter().find_map(|port| inputs.get(port.id))
}
