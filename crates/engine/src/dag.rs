//! DAG validation — spec.md §4.4: "Runs after parse, before any execution.
//! Builds adjacency from `edges`, performs DFS cycle detection from every
//! node (not only start), confirms `start_node` exists, and computes
//! reachable-from-start. Orphan nodes are logged as warnings, not fatal."
//!
//! Adapted from the teacher's Kahn's-algorithm `validate_dag` (originally
//! keyed on a `Vec<NodeDefinition>`/`Vec<Edge>` model) onto `parser::Workflow`'s
//! `IndexMap`-based `nodes`/`edges`.

use std::collections::{HashSet, VecDeque};

use parser::Workflow;

use crate::EngineError;

/// Validate `workflow`'s DAG and return a topological execution order.
///
/// This order is informational only for the execution manager (which walks
/// a FIFO queue seeded from `start_node`, §4.5) but is exactly what
/// `dry_run` mode reports as the planned order, and is the most direct way
/// to detect a cycle without caring which node it was reached from.
///
/// # Errors
/// - [`EngineError::UnknownStartNode`] if `start_node` isn't in `nodes`.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    if !workflow.nodes.contains_key(&workflow.start_node) {
        return Err(EngineError::UnknownStartNode(workflow.start_node.clone()));
    }

    for (source, targets) in &workflow.edges {
        if !workflow.nodes.contains_key(source) {
            return Err(EngineError::UnknownNodeReference {
                node_id: source.clone(),
                side: "source",
            });
        }
        for target in targets {
            if !workflow.nodes.contains_key(target) {
                return Err(EngineError::UnknownNodeReference {
                    node_id: target.clone(),
                    side: "target",
                });
            }
        }
    }

    // Kahn's algorithm: a cycle exists iff the sort can't consume every node.
    let mut in_degree: std::collections::HashMap<&str, usize> =
        workflow.nodes.keys().map(|id| (id.as_str(), 0)).collect();

    for targets in workflow.edges.values() {
        for target in targets {
            *in_degree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    queue.make_contiguous().sort();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());
    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());
        for target in workflow.successors(node_id) {
            let deg = in_degree.entry(target.as_str()).or_insert(0);
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(target.as_str());
            }
        }
    }

    if sorted.len() != workflow.nodes.len() {
        let unsorted = workflow
            .nodes
            .keys()
            .find(|id| !sorted.contains(id))
            .cloned()
            .unwrap_or_default();
        return Err(EngineError::CycleDetected(unsorted));
    }

    warn_on_orphans(workflow, &sorted);

    Ok(sorted)
}

/// Nodes unreachable from `start_node` are a warning, not a validation
/// failure (spec.md §4.4).
fn warn_on_orphans(workflow: &Workflow, _topo_order: &[String]) {
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(workflow.start_node.as_str());
    reachable.insert(workflow.start_node.as_str());

    while let Some(node_id) = queue.pop_front() {
        for target in workflow.successors(node_id) {
            if reachable.insert(target.as_str()) {
                queue.push_back(target.as_str());
            }
        }
    }

    for node_id in workflow.nodes.keys() {
        if !reachable.contains(node_id.as_str()) {
            tracing::warn!("node '{node_id}' is not reachable from start_node '{}'", workflow.start_node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::NodeDef;

    fn workflow_with(start: &str, node_ids: &[&str], edges: &[(&str, &str)]) -> Workflow {
        let mut wf = Workflow::empty("test", start);
        for id in node_ids {
            wf.nodes.insert(id.to_string(), NodeDef::new(*id, "noop"));
        }
        for (src, dst) in edges {
            wf.edges.entry(src.to_string()).or_default().push(dst.to_string());
        }
        wf
    }

    #[test]
    fn valid_linear_dag_returns_sorted_order() {
        let wf = workflow_with("a", &["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let sorted = validate_dag(&wf).expect("should be valid");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn valid_diamond_dag() {
        let wf = workflow_with(
            "a",
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let sorted = validate_dag(&wf).expect("should be valid");
        assert_eq!(sorted.first().unwrap(), "a");
        assert_eq!(sorted.last().unwrap(), "d");
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn unknown_start_node_is_rejected() {
        let wf = workflow_with("ghost", &["a"], &[]);
        assert!(matches!(validate_dag(&wf), Err(EngineError::UnknownStartNode(id)) if id == "ghost"));
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let mut wf = workflow_with("a", &["a"], &[]);
        wf.edges.insert("a".to_string(), vec!["ghost".to_string()]);
        assert!(matches!(
            validate_dag(&wf),
            Err(EngineError::UnknownNodeReference { node_id, .. }) if node_id == "ghost"
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let wf = workflow_with("a", &["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(matches!(validate_dag(&wf), Err(EngineError::CycleDetected(_))));
    }

    #[test]
    fn single_node_no_edges_is_valid() {
        let wf = workflow_with("solo", &["solo"], &[]);
        let sorted = validate_dag(&wf).expect("single node should be valid");
        assert_eq!(sorted, vec!["solo"]);
    }

    #[test]
    fn orphan_node_is_a_warning_not_an_error() {
        let wf = workflow_with("a", &["a", "b", "orphan"], &[("a", "b")]);
        let sorted = validate_dag(&wf).expect("orphans don't fail validation");
        assert_eq!(sorted.len(), 3);
    }
}
