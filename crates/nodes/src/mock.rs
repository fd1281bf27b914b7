//! `MockNode` — a test double for `ExecutableNode`, adapted from the
//! teacher's `MockNode` to speak `ExecutorInput`/`NodeResult` instead of raw
//! `serde_json::Value`.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    ReturnValue(Value),
    FailRetryable(String),
    FailFatal(String),
}

/// A mock node that records every call it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    pub name: String,
    pub behaviour: MockBehaviour,
    pub calls: Arc<Mutex<Vec<IndexMap<String, Value>>>>,
}

impl MockNode {
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnValue(value),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::FailFatal(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::FailRetryable(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        self.calls.lock().unwrap().push(input.params.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => {
                let mut out = IndexMap::new();
                out.insert("node".to_string(), Value::String(self.name.clone()));
                if let Value::Map(m) = v {
                    for (k, val) in m {
                        out.insert(k.clone(), val.clone());
                    }
                }
                NodeResult::success(Value::Map(out))
            }
            MockBehaviour::FailRetryable(msg) => NodeResult::error(msg.clone(), "NodeExecutionError"),
            MockBehaviour::FailFatal(msg) => NodeResult::error(msg.clone(), "NodeFatalError"),
        }
    }
}
