//! `nodes` crate — the `ExecutableNode` trait, the node registry, and the
//! built-in executors (spec.md §4.3).

pub mod builtin;
pub mod error;
pub mod mock;
pub mod model;
pub mod naming;
pub mod registry;
pub mod traits;

pub use error::NodeError;
pub use model::{ExecutorInput, NodeResult, NodeStatus};
pub use naming::derive_node_type;
pub use registry::{NodeRegistry, RegistryBuilder};
pub use traits::{ExecutableNode, NodeSchema, ParamSpec};
