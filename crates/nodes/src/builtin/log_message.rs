//! `log_message` — logs `message` at `level` via `tracing`, echoes input.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct LogMessageNode;

#[async_trait]
impl ExecutableNode for LogMessageNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        let message = input
            .param("message")
            .map(Value::stringify)
            .unwrap_or_default();
        let level = input.param("level").and_then(Value::as_str).unwrap_or("info");

        match level {
            "error" => tracing::error!(node = %input.node_name, "{message}"),
            "warn" | "warning" => tracing::warn!(node = %input.node_name, "{message}"),
            "debug" => tracing::debug!(node = %input.node_name, "{message}"),
            _ => tracing::info!(node = %input.node_name, "{message}"),
        }

        NodeResult::success(Value::String(message))
    }
}
