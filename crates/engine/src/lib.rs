//! `engine` crate — DAG validation and the execution manager that walks a
//! parsed `Workflow` node by node (spec.md §4.4/§4.5), resolving
//! placeholders, coercing types, retrying through per-type circuit
//! breakers, and checkpointing.

pub mod checkpoint;
pub mod circuit_breaker;
pub mod coercion;
pub mod dag;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod scheduler;
pub mod state;

pub use checkpoint::Checkpoint;
pub use dag::validate_dag;
pub use error::EngineError;
pub use graph::{export_execution_graph, GraphFormat};
pub use metrics::Metrics;
pub use scheduler::{Engine, EngineConfig, ExecutionResult, RunOutcome};
pub use state::{ExecutionState, NodeStatusEntry, NodeStatusKind};

#[cfg(test)]
mod integration_tests;
