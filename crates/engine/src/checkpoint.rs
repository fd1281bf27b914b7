//! Checkpoint file — spec.md §4.5.5 / §6.3: "JSON with fields
//! `execution_id`, `node_results`, `executed_nodes`, `node_execution_status`,
//! `resolved_values_by_key`, `metrics`, `timestamp`... Reading a checkpoint
//! written by a different engine version must either succeed or fail with a
//! clear error; there is no silent migration." (We rely on plain
//! `serde_json` struct decoding for that: an incompatible shape is a
//! deserialize error, not a best-effort partial load.)

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use value::Value;

use nodes::NodeResult;

use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::state::{ExecutionState, NodeStatusEntry};

/// Every field of [`ExecutionState`] except the resolver's own
/// `resolution_cache`, which is "intentionally dropped" per spec.md §4.5.5.
#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub execution_id: Uuid,
    pub node_results: IndexMap<String, NodeResult>,
    pub executed_nodes: Vec<String>,
    pub node_execution_status: IndexMap<String, NodeStatusEntry>,
    pub resolved_values_by_key: IndexMap<String, Value>,
    pub metrics: Metrics,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    pub fn from_state(state: &ExecutionState) -> Self {
        Self {
            execution_id: state.execution_id,
            node_results: state.node_results.clone(),
            executed_nodes: state.executed.iter().cloned().collect(),
            node_execution_status: state.node_status.clone(),
            resolved_values_by_key: state.resolved_keys.clone(),
            metrics: state.metrics.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Rehydrate an `ExecutionState` so a subsequent run skips already-
    /// executed nodes and has their results available to downstream
    /// placeholder resolution.
    pub fn apply_to(self, state: &mut ExecutionState) {
        state.execution_id = self.execution_id;
        state.node_results = self.node_results;
        state.executed = self.executed_nodes.into_iter().collect();
        state.node_status = self.node_execution_status;
        state.resolved_keys = self.resolved_values_by_key;
        state.metrics = self.metrics;
    }

    pub fn save(&self, dir: &Path, name: Option<&str>) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(dir).map_err(|e| EngineError::Checkpoint(e.to_string()))?;
        let filename = name.map(|n| n.to_string()).unwrap_or_else(|| format!("{}.json", self.execution_id));
        let path = dir.join(filename);
        let body = serde_json::to_string_pretty(self).map_err(|e| EngineError::Checkpoint(e.to_string()))?;
        std::fs::write(&path, body).map_err(|e| EngineError::Checkpoint(e.to_string()))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let body = std::fs::read_to_string(path).map_err(|e| EngineError::Checkpoint(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            EngineError::Checkpoint(format!(
                "checkpoint '{}' could not be read by this engine version: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NodeStatusKind;

    #[test]
    fn round_trips_through_json() {
        let mut state = ExecutionState::new(Uuid::new_v4());
        state.record_result("a", NodeResult::success(Value::Int(1)));
        state.mark_status("a", NodeStatusKind::Success, "ok");
        state.resolved_keys.insert("greeting".to_string(), Value::String("hi".to_string()));

        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::from_state(&state);
        let path = checkpoint.save(dir.path(), None).unwrap();

        let loaded = Checkpoint::load(&path).unwrap();
        let mut restored = ExecutionState::new(Uuid::new_v4());
        loaded.apply_to(&mut restored);

        assert!(restored.executed.contains("a"));
        assert_eq!(restored.resolved_keys["greeting"], Value::String("hi".to_string()));
    }

    #[test]
    fn incompatible_shape_is_a_clear_error_not_a_silent_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"totally\": \"not a checkpoint\"}").unwrap();
        assert!(Checkpoint::load(&path).is_err());
    }
}
