//! Topological ordering of pipeline nodes.

use crate::errors::CycleDetectedError;
use crate::graph::{Edge, Node};
use std::collections::{HashMap, VecDeque};

/// Orders nodes so every edge's source precedes its target (Kahn's algorithm).
///
/// The ready queue is seeded in node-list order and successors are released
/// in edge-list order, so the result is deterministic for a given input.
/// Edges whose endpoints are not in `nodes` are ignored.
///
/// # Errors
///
/// Returns [`CycleDetectedError`] naming the unscheduled nodes if the graph
/// contains a cycle. No partial order is returned.
pub fn topological_sort(nodes: &[Node], edges: &[Edge]) -> Result<Vec<String>, CycleDetectedError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut ids: Vec<&str> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !index.contains_key(node.id.as_str()) {
            index.insert(node.id.as_str(), ids.len());
            ids.push(node.id.as_str());
        }
    }

    let mut in_degree = vec![0_usize; ids.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for edge in edges {
        let (Some(&source), Some(&target)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
        else {
            continue;
        };
        successors[source].push(target);
        in_degree[target] += 1;
    }

    let mut ready: VecDeque<usize> = (0..ids.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(ids.len());

    while let Some(current) = ready.pop_front() {
        order.push(ids[current].to_string());
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() < ids.len() {
        let blocked = (0..ids.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| ids[i].to_string())
            .collect();
        return Err(CycleDetectedError::new(blocked));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use pretty_assertions::assert_eq;
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn nodes(ids: &[&str]) -> Vec<Node> {
        ids.iter().map(|id| Node::with_defaults(*id, NodeKind::Preview)).collect()
    }

    fn link(source: &str, target: &str) -> Edge {
        Edge::new(source, "media", target, "media")
    }

    #[test]
    fn test_linear_chain() {
        let order = topological_sort(&nodes(&["C", "B", "A"]), &[link("A", "B"), link("B", "C")]).unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_diamond_respects_node_list_tie_break() {
        let edges = [link("A", "B"), link("A", "C"), link("B", "D"), link("C", "D")];
        let order = topological_sort(&nodes(&["A", "B", "C", "D"]), &edges).unwrap();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_independent_nodes_keep_list_order() {
        let order = topological_sort(&nodes(&["x", "y", "z"]), &[]).unwrap();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_empty_graph() {
        assert!(topological_sort(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_edges_to_unknown_nodes_are_ignored() {
        let order = topological_sort(&nodes(&["A", "B"]), &[link("A", "ghost"), link("ghost", "B")]).unwrap();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_cycle_is_an_error_not_a_partial_order() {
        let edges = [link("A", "B"), link("B", "C"), link("C", "B")];
        let err = topological_sort(&nodes(&["A", "B", "C"]), &edges).unwrap_err();
        assert_eq!(err.nodes, vec!["B", "C"]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let err = topological_sort(&nodes(&["A"]), &[link("A", "A")]).unwrap_err();
        assert_eq!(err.nodes, vec!["A"]);
    }

    #[test]
    fn test_random_dags_are_ordered() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let count = rng.gen_range(1..30);
            let ids: Vec<String> = (0..count).map(|i| format!("n{i}")).collect();

            let mut edges = Vec::new();
            for i in 0..count {
                for j in (i + 1)..count {
                    if rng.gen_bool(0.2) {
                        edges.push(link(&ids[i], &ids[j]));
                    }
                }
            }

            let mut shuffled: Vec<&str> = ids.iter().map(String::as_str).collect();
            shuffled.shuffle(&mut rng);

            let order = topological_sort(&nodes(&shuffled), &edges).unwrap();
            assert_eq!(order.len(), count);
            let position: HashMap<&str, usize> = order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
            for edge in &edges {
                assert!(position[edge.source.as_str()] < position[edge.target.as_str()]);
            }
        }
    }
}
