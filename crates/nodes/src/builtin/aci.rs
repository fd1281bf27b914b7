//! `aci` — a marker executor for dynamic HTTP route registration (spec.md
//! §4.7). `operation = add_route` just echoes the route definition back; the
//! actual axum binding happens in the agent crate, which scans the workflow
//! for nodes of this type at startup.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct AciNode;

#[async_trait]
impl ExecutableNode for AciNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        let operation = input
            .param("operation")
            .and_then(Value::as_str)
            .unwrap_or("add_route");

        match operation {
            "add_route" | "remove_route" => NodeResult::success(Value::Map(input.params)),
            other => NodeResult::error(format!("unknown aci operation '{other}'"), "NodeValidationError"),
        }
    }
}
