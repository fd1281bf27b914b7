//! The node registry — spec.md §4.3: "Maps `type` (String) → executor
//! factory... Conflicts: first registration wins; subsequent registrations
//! for the same type are logged and ignored."

use std::collections::HashMap;
use std::sync::Arc;

use crate::naming::derive_node_type;
use crate::traits::ExecutableNode;

pub type NodeRegistry = HashMap<String, Arc<dyn ExecutableNode>>;

/// Builds up a [`NodeRegistry`], mirroring `discover_node_classes`'
/// first-wins semantics without Python's runtime module scanning: each
/// built-in or plugin executor calls `register`/`register_as` explicitly at
/// `Engine` construction time.
#[derive(Default)]
pub struct RegistryBuilder {
    nodes: NodeRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under an explicit type string.
    pub fn register(&mut self, node_type: impl Into<String>, node: Arc<dyn ExecutableNode>) -> &mut Self {
        let node_type = node_type.into();
        if self.nodes.contains_key(&node_type) {
            tracing::warn!("node type '{node_type}' already registered; ignoring duplicate");
            return self;
        }
        self.nodes.insert(node_type, node);
        self
    }

    /// Register under the type string derived from `T`'s name (spec.md
    /// §4.3's CamelCase → snake_case convention, e.g. `MyFooNode` → `my_foo`).
    pub fn register_as<T: ExecutableNode + 'static>(&mut self, node: T) -> &mut Self {
        let node_type = derive_node_type(std::any::type_name::<T>());
        self.register(node_type, Arc::new(node))
    }

    pub fn build(self) -> NodeRegistry {
        self.nodes
    }
}
