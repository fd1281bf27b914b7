//! The parsed workflow model — spec.md §3.2/§3.3.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use value::Value;

/// A single step in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique identifier within the workflow (referenced by edges).
    pub id: String,
    /// Selects an `ExecutableNode` implementation via the node registry.
    pub node_type: String,
    /// All other keys from the `[node:<id>]` section, resolved at use time.
    pub params: IndexMap<String, Value>,
}

impl NodeDef {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params: IndexMap::new(),
        }
    }
}

/// A complete Actfile workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub description: String,
    pub start_node: String,
    pub parameters: IndexMap<String, Value>,
    pub env: IndexMap<String, String>,
    pub settings: IndexMap<String, Value>,
    pub configuration: IndexMap<String, Value>,
    pub deployment: IndexMap<String, Value>,
    pub nodes: IndexMap<String, NodeDef>,
    /// source node id -> ordered list of target node ids (order matters for `if`/`switch`).
    pub edges: IndexMap<String, Vec<String>>,
    /// node-type -> ordered advisory dependency list.
    pub dependencies: IndexMap<String, Vec<String>>,
}

impl Workflow {
    pub fn empty(name: impl Into<String>, start_node: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_node: start_node.into(),
            parameters: IndexMap::new(),
            env: IndexMap::new(),
            settings: IndexMap::new(),
            configuration: IndexMap::new(),
            deployment: IndexMap::new(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            dependencies: IndexMap::new(),
        }
    }

    /// Ordered successor list for a node id (empty if it has none).
    pub fn successors(&self, node_id: &str) -> &[String] {
        self.edges.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
