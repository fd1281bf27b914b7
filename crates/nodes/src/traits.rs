//! The `ExecutableNode` trait — spec.md §4.3: "An executor exposes a single
//! operation: `execute(input: ExecutorInput) -> NodeResult`."

use async_trait::async_trait;

use crate::error::NodeError;
use crate::model::{ExecutorInput, NodeResult};

/// Optional parameter documentation an executor can publish — spec.md §6.2:
/// "Executors may publish a schema (parameter list with types and enums)
/// used for documentation and optional validation."
#[derive(Debug, Clone)]
pub struct NodeSchema {
    pub node_type: String,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_hint: &'static str,
    pub required: bool,
    pub enum_values: Vec<String>,
}

#[async_trait]
pub trait ExecutableNode: Send + Sync {
    async fn execute(&self, input: ExecutorInput) -> NodeResult;

    fn schema(&self) -> Option<NodeSchema> {
        None
    }
}

impl From<NodeError> for NodeResult {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Retryable(msg) => NodeResult::error(msg, "NodeExecutionError"),
            NodeError::Fatal(msg) => NodeResult::error(msg, "NodeFatalError"),
            NodeError::Validation(msg) => NodeResult::error(msg, "NodeValidationError"),
        }
    }
}
