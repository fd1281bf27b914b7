//! `if` — evaluates `value1 operator value2` and returns `result: Bool`.
//! Grounded on `original_source/.../nodes/if_node.py`.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct IfNode;

fn compare(op: &str, a: &Value, b: &Value) -> bool {
    match op {
        "eq" => values_equal(a, b),
        "neq" => !values_equal(a, b),
        "gt" => numeric_cmp(a, b).map(|o| o.is_gt()).unwrap_or(false),
        "gte" => numeric_cmp(a, b).map(|o| o.is_ge()).unwrap_or(false),
        "lt" => numeric_cmp(a, b).map(|o| o.is_lt()).unwrap_or(false),
        "lte" => numeric_cmp(a, b).map(|o| o.is_le()).unwrap_or(false),
        "contains" => match (a, b) {
            (Value::List(items), needle) => items.contains(needle),
            (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
            _ => false,
        },
        other => {
            tracing::warn!("if node: unknown operator '{other}'");
            false
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.stringify() == b.stringify(),
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

#[async_trait]
impl ExecutableNode for IfNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        let value1 = input.param("value1").cloned().unwrap_or(Value::Null);
        let value2 = input.param("value2").cloned().unwrap_or(Value::Null);
        let operator = input
            .param("operator")
            .and_then(Value::as_str)
            .unwrap_or("eq")
            .to_string();

        let result = compare(&operator, &value1, &value2);
        NodeResult::success(Value::Bool(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn input(params: IndexMap<String, Value>) -> ExecutorInput {
        ExecutorInput {
            node_type: "if".into(),
            label: String::new(),
            description: String::new(),
            params,
            node_name: "cond".into(),
            execution_id: "e1".into(),
        }
    }

    #[tokio::test]
    async fn gt_compares_numerically() {
        let mut params = IndexMap::new();
        params.insert("value1".into(), Value::Int(5));
        params.insert("value2".into(), Value::Int(3));
        params.insert("operator".into(), Value::String("gt".into()));
        let result = IfNode.execute(input(params)).await;
        assert_eq!(result.result, Value::Bool(true));
    }

    #[tokio::test]
    async fn contains_checks_list_membership() {
        let mut params = IndexMap::new();
        params.insert(
            "value1".into(),
            Value::List(vec![Value::Int(1), Value::Int(2)]),
        );
        params.insert("value2".into(), Value::Int(2));
        params.insert("operator".into(), Value::String("contains".into()));
        let result = IfNode.execute(input(params)).await;
        assert_eq!(result.result, Value::Bool(true));
    }
}
