//! Engine-level error types — spec.md §7's error-kind table.

use thiserror::Error;

/// Errors produced by DAG validation and the execution manager.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors (fatal to load) ------
    #[error("duplicate node id: '{0}'")]
    DuplicateNodeId(String),

    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    #[error("start_node '{0}' is not defined")]
    UnknownStartNode(String),

    #[error("workflow graph contains a cycle reaching node '{0}'")]
    CycleDetected(String),

    // ------ Resolution errors (fatal to run) ------
    #[error("unresolvable placeholder while executing node '{node_id}': {message}")]
    ResolutionError { node_id: String, message: String },

    #[error("circular placeholder reference while executing node '{node_id}': {reference}")]
    PlaceholderCycleError { node_id: String, reference: String },

    // ------ Node-level errors ------
    #[error("no executor registered for node type '{0}'")]
    UnknownNodeType(String),

    #[error("node '{node_id}' failed validation: {message}")]
    NodeValidationError { node_id: String, message: String },

    #[error("node '{node_id}' exhausted its retries: {message}")]
    NodeExecutionError { node_id: String, message: String },

    #[error("circuit breaker open for node type '{node_type}' (node '{node_id}')")]
    CircuitBreakerError { node_id: String, node_type: String },

    #[error("sandbox_timeout exceeded before node '{0}' could start")]
    TimeoutError(String),

    // ------ Successor-selection errors ------
    #[error("node '{node_id}' (type `if`) returned a non-boolean result")]
    NonBooleanIfResult { node_id: String },

    #[error("node '{node_id}' (type `switch`) selected '{selected}', which is not one of its edges")]
    InvalidSwitchSelection { node_id: String, selected: String },

    // ------ Checkpointing ------
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl EngineError {
    /// Bridge a [`resolver::ResolverError`] into the richer engine-level
    /// distinction spec.md §7 draws between a plain unresolved placeholder
    /// and a self-referential one.
    pub fn from_resolver(node_id: &str, err: resolver::ResolverError) -> Self {
        match err {
            resolver::ResolverError::PlaceholderCycle(reference) => {
                EngineError::PlaceholderCycleError { node_id: node_id.to_string(), reference }
            }
            other => EngineError::ResolutionError {
                node_id: node_id.to_string(),
                message: other.to_string(),
            },
        }
    }
}
