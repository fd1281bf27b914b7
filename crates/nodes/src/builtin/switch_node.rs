//! `switch` — evaluates `value` against an ordered `cases` map and returns
//! `selected_node`.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct SwitchNode;

#[async_trait]
impl ExecutableNode for SwitchNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        let value = input.param("value").cloned().unwrap_or(Value::Null);
        let cases = match input.param("cases") {
            Some(Value::Map(m)) => m.clone(),
            _ => {
                return NodeResult::error(
                    "switch node requires a 'cases' map parameter",
                    "NodeValidationError",
                )
            }
        };

        let key = value.stringify();
        let selected = cases.get(&key).cloned().or_else(|| cases.get("default").cloned());

        match selected {
            Some(node_id) => {
                let mut result = indexmap::IndexMap::new();
                result.insert("selected_node".to_string(), node_id.clone());
                NodeResult::success(Value::Map(result))
            }
            None => NodeResult::warning(
                format!("no matching case for value '{key}' and no default"),
                Value::Null,
            ),
        }
    }
}
