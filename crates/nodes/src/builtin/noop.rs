//! `noop` — identity passthrough, used by tests.

use async_trait::async_trait;
use value::Value;

use crate::model::{ExecutorInput, NodeResult};
use crate::traits::ExecutableNode;

pub struct NoopNode;

#[async_trait]
impl ExecutableNode for NoopNode {
    async fn execute(&self, input: ExecutorInput) -> NodeResult {
        NodeResult::success(Value::Map(input.params))
    }
}
