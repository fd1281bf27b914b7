//! `ExecutorInput`/`NodeResult` — spec.md §3.4/§4.3.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use value::Value;

/// What the engine hands to an executor: node metadata plus the already
/// resolved and type-coerced `params`.
#[derive(Debug, Clone)]
pub struct ExecutorInput {
    pub node_type: String,
    pub label: String,
    pub description: String,
    pub params: IndexMap<String, Value>,
    /// Injected context, spec.md §4.3: `__node_name`, `__execution_id`.
    pub node_name: String,
    pub execution_id: String,
}

impl ExecutorInput {
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// spec.md §3.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub status: NodeStatus,
    pub message: String,
    pub result: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl NodeResult {
    pub fn success(result: Value) -> Self {
        Self {
            status: NodeStatus::Success,
            message: String::new(),
            result,
            data: Value::Null,
            error_type: None,
        }
    }

    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            status: NodeStatus::Error,
            message: message.into(),
            result: Value::Null,
            data: Value::Null,
            error_type: Some(error_type.into()),
        }
    }

    pub fn warning(message: impl Into<String>, result: Value) -> Self {
        Self {
            status: NodeStatus::Warning,
            message: message.into(),
            result,
            data: Value::Null,
            error_type: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == NodeStatus::Error
    }

    /// Is this a "validation" failure per spec.md §4.5.2 (not retried)?
    pub fn is_validation_error(&self) -> bool {
        self.is_error()
            && (self.error_type.as_deref() == Some("NodeValidationError")
                || self.message.to_lowercase().contains("validation"))
    }

    /// Flatten into a `Value::Map` the way a completed node's entry is
    /// stored in `node_results` for placeholder resolution (spec.md §4.2:
    /// "every completed node's NodeResult under its NodeId").
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        map.insert(
            "status".to_string(),
            Value::String(
                match self.status {
                    NodeStatus::Success => "success",
                    NodeStatus::Warning => "warning",
                    NodeStatus::Error => "error",
                }
                .to_string(),
            ),
        );
        map.insert("message".to_string(), Value::String(self.message.clone()));
        map.insert("result".to_string(), self.result.clone());
        map.insert("data".to_string(), self.data.clone());
        if let Some(error_type) = &self.error_type {
            map.insert("error_type".to_string(), Value::String(error_type.clone()));
        }
        Value::Map(map)
    }
}
