//! Execution manager — spec.md §4.5: FIFO-queue scheduling, retry + circuit
//! breaker execution, successor selection, and the side effects of `set`
//! and `aci` nodes.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use value::Value;

use nodes::{ExecutableNode, ExecutorInput, NodeRegistry, NodeResult, NodeStatus};
use parser::Workflow;
use resolver::{ResolutionContext, Resolver};

use crate::checkpoint::Checkpoint;
use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakers};
use crate::coercion::coerce_params;
use crate::dag::validate_dag;
use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::state::{ExecutionState, NodeStatusEntry, NodeStatusKind};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// spec.md §8: "the number of retry attempts <= configured
    /// `max_retries_per_node` + 1" — this is the retry budget, not the
    /// total attempt count.
    pub max_retries_per_node: u32,
    /// `None` disables the run-wide deadline.
    pub sandbox_timeout: Option<Duration>,
    pub fail_on_unresolved: bool,
    pub circuit_breaker: CircuitBreakerConfig,
    pub checkpoint_dir: Option<std::path::PathBuf>,
    pub auto_checkpoint: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries_per_node: 3,
            sandbox_timeout: None,
            fail_on_unresolved: false,
            circuit_breaker: CircuitBreakerConfig::default(),
            checkpoint_dir: None,
            auto_checkpoint: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Error,
    Paused { node_id: String },
}

/// The user-visible shape mandated by spec.md §7 for "every terminal engine
/// result... even on error."
#[derive(Debug)]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    pub outcome: RunOutcome,
    pub message: String,
    pub results: IndexMap<String, NodeResult>,
    pub node_status: IndexMap<String, NodeStatusEntry>,
    pub metrics: Metrics,
}

impl ExecutionResult {
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        let status = match &self.outcome {
            RunOutcome::Success => "success",
            RunOutcome::Error => "error",
            RunOutcome::Paused { .. } => "paused",
        };
        map.insert("status".to_string(), Value::String(status.to_string()));
        map.insert("message".to_string(), Value::String(self.message.clone()));
        map.insert(
            "results".to_string(),
            Value::Map(self.results.iter().map(|(k, v)| (k.clone(), v.to_value())).collect()),
        );
        map.insert(
            "node_status".to_string(),
            Value::Map(
                self.node_status
                    .iter()
                    .map(|(k, entry)| {
                        let mut e = IndexMap::new();
                        e.insert("status".to_string(), Value::String(status_kind_str(entry.status).to_string()));
                        e.insert("message".to_string(), Value::String(entry.message.clone()));
                        (k.clone(), Value::Map(e))
                    })
                    .collect(),
            ),
        );
        map.insert("execution_id".to_string(), Value::String(self.execution_id.to_string()));
        map.insert("metrics".to_string(), self.metrics.to_value());
        Value::Map(map)
    }
}

fn status_kind_str(kind: NodeStatusKind) -> &'static str {
    match kind {
        NodeStatusKind::Pending => "pending",
        NodeStatusKind::Running => "running",
        NodeStatusKind::Success => "success",
        NodeStatusKind::Error => "error",
        NodeStatusKind::Warning => "warning",
        NodeStatusKind::Skipped => "skipped",
        NodeStatusKind::Retrying => "retrying",
    }
}

/// Runs one workflow's DAG to completion (or pause/error). Holds the node
/// registry and per-node-type circuit breakers, which are process-wide in
/// spirit but owned per `Engine` instance here since nothing in this crate
/// needs more than one workflow loaded at a time (the agent crate, which
/// does, owns one `Engine` per loaded workflow).
pub struct Engine {
    workflow: Workflow,
    registry: NodeRegistry,
    config: EngineConfig,
    breakers: CircuitBreakers,
}

impl Engine {
    pub fn new(workflow: Workflow, registry: NodeRegistry, config: EngineConfig) -> Result<Self, EngineError> {
        validate_dag(&workflow)?;
        for node in workflow.nodes.values() {
            if !registry.contains_key(&node.node_type) {
                return Err(EngineError::UnknownNodeType(node.node_type.clone()));
            }
        }
        let breakers = CircuitBreakers::new(config.circuit_breaker.clone());
        Ok(Self { workflow, registry, config, breakers })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// spec.md §4.5: "In `dry_run` mode it returns the planned execution
    /// order and validation results without running executors."
    pub fn dry_run(&self) -> Result<Vec<String>, EngineError> {
        validate_dag(&self.workflow)
    }

    #[instrument(skip(self, initial_input, state), fields(execution_id = %state.execution_id))]
    pub async fn execute(&mut self, initial_input: Value, state: &mut ExecutionState) -> ExecutionResult {
        let mut resolver = Resolver::new(self.config.fail_on_unresolved);
        let mut ctx = ResolutionContext::new(initial_input);
        ctx.resolved_keys = state.resolved_keys.clone();
        for (node_id, result) in &state.node_results {
            ctx.record_result(node_id.clone(), result.to_value());
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut seed = |id: &str, queue: &mut VecDeque<String>, queued: &mut HashSet<String>| {
            if !state.executed.contains(id) && queued.insert(id.to_string()) {
                queue.push_back(id.to_string());
            }
        };
        seed(&self.workflow.start_node, &mut queue, &mut queued);
        // Resuming from a checkpoint: already-executed nodes don't get
        // re-enqueued, but their not-yet-run successors still need to be, or
        // the walk would stop dead at the resume point.
        for executed_id in &state.executed {
            for succ in self.workflow.successors(executed_id) {
                seed(succ, &mut queue, &mut queued);
            }
        }

        let deadline = self.config.sandbox_timeout.map(|d| Instant::now() + d);

        while let Some(node_id) = queue.pop_front() {
            queued.remove(&node_id);

            // Step 1: skip if already executed or unknown.
            if state.executed.contains(&node_id) {
                continue;
            }
            let Some(node_def) = self.workflow.nodes.get(&node_id).cloned() else {
                continue;
            };

            // Step 2: breakpoints pause between nodes.
            if state.breakpoints.contains(&node_id) {
                return self.finish(state, RunOutcome::Paused { node_id: node_id.clone() }, format!("paused before node '{node_id}'"));
            }

            // Step 3: run-wide deadline.
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return self.finish(state, RunOutcome::Error, "sandbox_timeout exceeded".to_string());
                }
            }

            // Step 4: resolve, coerce, build ExecutorInput.
            state.mark_status(&node_id, NodeStatusKind::Running, "running");

            let resolved = match resolver.resolve_value(&Value::Map(node_def.params.clone()), &ctx) {
                Ok(Value::Map(m)) => m,
                Ok(_) => IndexMap::new(),
                Err(e) => {
                    let engine_err = EngineError::from_resolver(&node_id, e);
                    let message = engine_err.to_string();
                    return self.finish(state, RunOutcome::Error, message);
                }
            };
            state.metrics.absorb_resolver_counters(resolver.cache_hits, resolver.cache_misses, resolver.total_resolved);

            let coerced = coerce_params(&resolved);
            let (params, label, description) = split_metadata(coerced);

            let executor = match self.registry.get(&node_def.node_type) {
                Some(executor) => Arc::clone(executor),
                None => {
                    return self.finish(
                        state,
                        RunOutcome::Error,
                        format!("no executor registered for node type '{}'", node_def.node_type),
                    )
                }
            };

            let input = ExecutorInput {
                node_type: node_def.node_type.clone(),
                label,
                description,
                params,
                node_name: node_id.clone(),
                execution_id: state.execution_id.to_string(),
            };

            // Step 5: execute through the retry/circuit-breaker wrapper.
            let started = Instant::now();
            let result = self.run_with_retry(&node_id, &node_def.node_type, executor.as_ref(), input, state).await;
            state.metrics.record_duration(&node_id, started.elapsed());

            ctx.record_result(node_id.clone(), result.to_value());
            self.apply_side_effects(&node_id, &node_def.node_type, &result, state, &mut ctx);

            // Step 6: store result, update status.
            let status_kind = match result.status {
                NodeStatus::Success => NodeStatusKind::Success,
                NodeStatus::Warning => NodeStatusKind::Warning,
                NodeStatus::Error => NodeStatusKind::Error,
            };
            let message = result.message.clone();
            let is_error = result.is_error();
            state.record_result(&node_id, result.clone());
            state.mark_status(&node_id, status_kind, message.clone());

            // Step 7: fail-fast on error.
            if is_error {
                info!("node '{node_id}' failed, aborting run: {message}");
                return self.finish(state, RunOutcome::Error, format!("node '{node_id}' failed: {message}"));
            }

            // Step 8: successor selection.
            match select_successors(&self.workflow, &node_id, &node_def.node_type, &result) {
                Ok(successors) => {
                    for succ in successors {
                        if !state.executed.contains(&succ) && !queued.contains(&succ) {
                            state.mark_status(&succ, NodeStatusKind::Pending, "queued");
                            queued.insert(succ.clone());
                            queue.push_back(succ);
                        }
                    }
                }
                Err(engine_err) => {
                    let message = engine_err.to_string();
                    return self.finish(state, RunOutcome::Error, message);
                }
            }
        }

        if self.config.auto_checkpoint {
            self.save_checkpoint(state, None);
        }

        self.finish(state, RunOutcome::Success, "execution completed".to_string())
    }

    pub fn save_checkpoint(&self, state: &mut ExecutionState, name: Option<&str>) -> Option<std::path::PathBuf> {
        let dir = self.config.checkpoint_dir.as_ref()?;
        match Checkpoint::from_state(state).save(dir, name) {
            Ok(path) => {
                state.metrics.checkpoint_saves += 1;
                Some(path)
            }
            Err(e) => {
                error!("failed to save checkpoint: {e}");
                None
            }
        }
    }

    pub fn load_checkpoint(path: &std::path::Path, state: &mut ExecutionState) -> Result<(), EngineError> {
        Checkpoint::load(path)?.apply_to(state);
        Ok(())
    }

    fn finish(&self, state: &ExecutionState, outcome: RunOutcome, message: String) -> ExecutionResult {
        ExecutionResult {
            execution_id: state.execution_id,
            outcome,
            message,
            results: state.node_results.clone(),
            node_status: state.node_status.clone(),
            metrics: state.metrics.clone(),
        }
    }

    /// spec.md §4.5.2: circuit breaker consulted before the first attempt;
    /// validation-class errors and circuit-open failures are not retried.
    async fn run_with_retry(
        &mut self,
        node_id: &str,
        node_type: &str,
        executor: &dyn ExecutableNode,
        input: ExecutorInput,
        state: &mut ExecutionState,
    ) -> NodeResult {
        if self.breakers.for_type(node_type).before_call().is_err() {
            state.metrics.record_circuit_trip(node_type);
            warn!("circuit breaker open for node type '{node_type}', failing '{node_id}' fast");
            return NodeResult::error(format!("circuit breaker open for node type '{node_type}'"), "CircuitBreakerError");
        }

        let max_attempts = self.config.max_retries_per_node + 1;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = executor.execute(input.clone()).await;

            if !result.is_error() {
                self.breakers.for_type(node_type).record_success();
                return result;
            }

            if result.is_validation_error() {
                self.breakers.for_type(node_type).record_failure();
                return result;
            }

            if attempt >= max_attempts {
                self.breakers.for_type(node_type).record_failure();
                return result;
            }

            state.metrics.record_retry(node_id);
            state.mark_status(node_id, NodeStatusKind::Retrying, result.message.clone());

            let delay = Duration::from_secs(2u64.saturating_pow(attempt).min(30));
            tokio::time::sleep(delay).await;
        }
    }

    /// spec.md §4.5.4: `set` binds `resolved_keys`; `aci` route
    /// (de)registration is the agent crate's concern (it scans the workflow
    /// directly at startup, §4.7), so this only logs here.
    fn apply_side_effects(
        &self,
        node_id: &str,
        node_type: &str,
        result: &NodeResult,
        state: &mut ExecutionState,
        ctx: &mut ResolutionContext,
    ) {
        match node_type {
            "set" => {
                if let Some(map) = result.result.as_map() {
                    if let (Some(key), Some(value)) = (map.get("key").and_then(Value::as_str), map.get("value")) {
                        state.resolved_keys.insert(key.to_string(), value.clone());
                        ctx.resolved_keys.insert(key.to_string(), value.clone());
                    }
                }
            }
            "aci" => {
                if let Some(operation) = result.result.as_map().and_then(|m| m.get("operation")).and_then(Value::as_str) {
                    info!("node '{node_id}' aci operation '{operation}' observed (route (un)registration is handled by the agent)");
                }
            }
            _ => {}
        }
    }
}

/// Pull `label`/`description` out of a resolved params map — spec.md §4.3:
/// `params` is "all resolved per-node keys except the metadata set."
fn split_metadata(mut params: IndexMap<String, Value>) -> (IndexMap<String, Value>, String, String) {
    let label = params.shift_remove("label").and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
    let description = params.shift_remove("description").and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
    (params, label, description)
}

/// spec.md §4.5.3.
fn select_successors(
    workflow: &Workflow,
    node_id: &str,
    node_type: &str,
    result: &NodeResult,
) -> Result<Vec<String>, EngineError> {
    let edges = workflow.successors(node_id);
    match node_type {
        "if" => match &result.result {
            Value::Bool(true) => Ok(edges.first().cloned().into_iter().collect()),
            Value::Bool(false) => Ok(edges.get(1).cloned().into_iter().collect()),
            _ => Err(EngineError::NonBooleanIfResult { node_id: node_id.to_string() }),
        },
        "switch" => {
            let selected = result.result.as_map().and_then(|m| m.get("selected_node"));
            match selected {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
                Some(Value::String(s)) => {
                    if edges.iter().any(|e| e == s) {
                        Ok(vec![s.clone()])
                    } else {
                        Err(EngineError::InvalidSwitchSelection { node_id: node_id.to_string(), selected: s.clone() })
                    }
                }
                Some(other) => {
                    Err(EngineError::InvalidSwitchSelection { node_id: node_id.to_string(), selected: other.stringify() })
                }
            }
        }
        _ => Ok(edges.to_vec()),
    }
}
