//! `ExecutionState` — spec.md §3.5: "owned by the execution manager for one
//! run." Never shared between runs; no locking needed.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use value::Value;

use nodes::NodeResult;

use crate::metrics::Metrics;

/// The seven states a node's status can occupy over a run — spec.md §3.5
/// and the ordering guarantee in §5: `pending -> running -> (success|error|
/// warning|retrying*)`, with any number of `retrying` interleaved with
/// `running` before a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatusKind {
    Pending,
    Running,
    Success,
    Error,
    Warning,
    Skipped,
    Retrying,
}

impl NodeStatusKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatusKind::Success | NodeStatusKind::Error | NodeStatusKind::Warning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusEntry {
    pub status: NodeStatusKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NodeStatusEntry {
    pub fn new(status: NodeStatusKind, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), timestamp: Utc::now() }
    }
}

/// One run's mutable state. The resolver's own memoization cache
/// (`resolution_cache`) is intentionally not duplicated here — it lives
/// inside the `resolver::Resolver` this state is paired with, and is
/// dropped rather than checkpointed (spec.md §4.5.5).
pub struct ExecutionState {
    pub execution_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub node_results: IndexMap<String, NodeResult>,
    pub node_status: IndexMap<String, NodeStatusEntry>,
    pub executed: HashSet<String>,
    pub resolved_keys: IndexMap<String, Value>,
    pub metrics: Metrics,
    pub breakpoints: HashSet<String>,
}

impl ExecutionState {
    pub fn new(execution_id: Uuid) -> Self {
        Self {
            execution_id,
            start_time: Utc::now(),
            node_results: IndexMap::new(),
            node_status: IndexMap::new(),
            executed: HashSet::new(),
            resolved_keys: IndexMap::new(),
            metrics: Metrics::default(),
            breakpoints: HashSet::new(),
        }
    }

    pub fn mark_status(&mut self, node_id: &str, status: NodeStatusKind, message: impl Into<String>) {
        self.node_status.insert(node_id.to_string(), NodeStatusEntry::new(status, message));
    }

    pub fn record_result(&mut self, node_id: &str, result: NodeResult) {
        self.executed.insert(node_id.to_string());
        self.node_results.insert(node_id.to_string(), result);
    }
}
