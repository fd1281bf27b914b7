//! Built-in executors — spec.md §4.3's minimal reference set, analogous to
//! the teacher's `MockNode`: enough specially-treated and generic types for
//! the engine to be runnable and testable without external collaborators.

pub mod aci;
pub mod if_node;
pub mod log_message;
pub mod noop;
pub mod set_node;
pub mod switch_node;

pub use aci::AciNode;
pub use if_node::IfNode;
pub use log_message::LogMessageNode;
pub use noop::NoopNode;
pub use set_node::SetNode;
pub use switch_node::SwitchNode;

use crate::registry::RegistryBuilder;

/// Register every built-in executor under its spec.md-mandated type string
/// (not the derived name, since e.g. `if` is shorter than `derive_node_type`
/// would produce from `IfNode` — which happens to agree here, but `aci`
/// and `set`/`switch`/`noop`/`log_message` are registered explicitly for
/// clarity and to keep the type strings stable if the structs are renamed).
pub fn register_builtins(registry: &mut RegistryBuilder) {
    registry
        .register("if", std::sync::Arc::new(IfNode))
        .register("switch", std::sync::Arc::new(SwitchNode))
        .register("set", std::sync::Arc::new(SetNode))
        .register("log_message", std::sync::Arc::new(LogMessageNode))
        .register("noop", std::sync::Arc::new(NoopNode))
        .register("aci", std::sync::Arc::new(AciNode));
}
