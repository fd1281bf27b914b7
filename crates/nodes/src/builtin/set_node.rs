//! `set` — binds `key`/`value` params into the result, used by the engine's
//! side-effect step (spec.md §4.5.4) to populate `resolved_keys`.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct SetNode;

#[async_trait]
impl ExecutableNode for SetNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        let Some(key) = input.param("key").and_then(Value::as_str) else {
            return NodeResult::error("set node requires a 'key' parameter", "NodeValidationError");
        };
        let value = input.param("value").cloned().unwrap_or(Value::Null);

        let mut result = indexmap::IndexMap::new();
        result.insert("key".to_string(), Value::String(key.to_string()));
        result.insert("value".to_string(), value);
        NodeResult::success(Value::Map(result))
    }
}
