//! Execution-graph export — spec.md §4.6: "An export hook returns also a
//! graph representation (nodes with status, edges), in-memory structure
//! suitable for DOT or Mermaid rendering."

use indexmap::IndexMap;
use value::Value;

use parser::Workflow;

use crate::state::NodeStatusEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Dict,
    Dot,
    Mermaid,
}

/// Render the workflow's graph, annotated with each node's last-known
/// status, in the requested format.
pub fn export_execution_graph(
    workflow: &Workflow,
    node_status: &IndexMap<String, NodeStatusEntry>,
    format: GraphFormat,
) -> String {
    match format {
        GraphFormat::Dict => export_dict(workflow, node_status),
        GraphFormat::Dot => export_dot(workflow, node_status),
        GraphFormat::Mermaid => export_mermaid(workflow, node_status),
    }
}

fn status_label(workflow_node_id: &str, node_status: &IndexMap<String, NodeStatusEntry>) -> &'static str {
    match node_status.get(workflow_node_id).map(|e| e.status) {
        Some(crate::state::NodeStatusKind::Success) => "success",
        Some(crate::state::NodeStatusKind::Error) => "error",
        Some(crate::state::NodeStatusKind::Warning) => "warning",
        Some(crate::state::NodeStatusKind::Running) => "running",
        Some(crate::state::NodeStatusKind::Retrying) => "retrying",
        Some(crate::state::NodeStatusKind::Skipped) => "skipped",
        Some(crate::state::NodeStatusKind::Pending) | None => "pending",
    }
}

fn export_dict(workflow: &Workflow, node_status: &IndexMap<String, NodeStatusEntry>) -> String {
    let mut nodes = Vec::new();
    for id in workflow.nodes.keys() {
        let mut n = IndexMap::new();
        n.insert("id".to_string(), Value::String(id.clone()));
        n.insert("status".to_string(), Value::String(status_label(id, node_status).to_string()));
        nodes.push(Value::Map(n));
    }

    let mut edges = Vec::new();
    for (src, targets) in &workflow.edges {
        for dst in targets {
            let mut e = IndexMap::new();
            e.insert("from".to_string(), Value::String(src.clone()));
            e.insert("to".to_string(), Value::String(dst.clone()));
            edges.push(Value::Map(e));
        }
    }

    let mut root = IndexMap::new();
    root.insert("nodes".to_string(), Value::List(nodes));
    root.insert("edges".to_string(), Value::List(edges));
    Value::Map(root).stringify()
}

fn export_dot(workflow: &Workflow, node_status: &IndexMap<String, NodeStatusEntry>) -> String {
    let mut out = String::from("digraph workflow {\n");
    for id in workflow.nodes.keys() {
        out.push_str(&format!("  \"{id}\" [label=\"{id}\\n{}\"];\n", status_label(id, node_status)));
    }
    for (src, targets) in &workflow.edges {
        for dst in targets {
            out.push_str(&format!("  \"{src}\" -> \"{dst}\";\n"));
        }
    }
    out.push_str("}\n");
    out
}

fn export_mermaid(workflow: &Workflow, node_status: &IndexMap<String, NodeStatusEntry>) -> String {
    let mut out = String::from("graph TD\n");
    for id in workflow.nodes.keys() {
        out.push_str(&format!("  {id}[\"{id} ({})\"]\n", status_label(id, node_status)));
    }
    for (src, targets) in &workflow.edges {
        for dst in targets {
            out.push_str(&format!("  {src} --> {dst}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::NodeDef;

    fn sample_workflow() -> Workflow {
        let mut wf = Workflow::empty("demo", "a");
        wf.nodes.insert("a".into(), NodeDef::new("a", "noop"));
        wf.nodes.insert("b".into(), NodeDef::new("b", "noop"));
        wf.edges.insert("a".into(), vec!["b".into()]);
        wf
    }

    #[test]
    fn dot_export_includes_every_node_and_edge() {
        let wf = sample_workflow();
        let dot = export_execution_graph(&wf, &IndexMap::new(), GraphFormat::Dot);
        assert!(dot.contains("\"a\" -> \"b\""));
    }

    #[test]
    fn mermaid_export_uses_arrow_syntax() {
        let wf = sample_workflow();
        let mermaid = export_execution_graph(&wf, &IndexMap::new(), GraphFormat::Mermaid);
        assert!(mermaid.contains("a --> b"));
    }

    #[test]
    fn dict_export_is_valid_json() {
        let wf = sample_workflow();
        let dict = export_execution_graph(&wf, &IndexMap::new(), GraphFormat::Dict);
        let parsed: serde_json::Value = serde_json::from_str(&dict).unwrap();
        assert_eq!(parsed["nodes"].as_array().unwrap().len(), 2);
    }
}
