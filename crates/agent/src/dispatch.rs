//! Per-request sub-DAG execution — spec.md §4.7 steps 1-5. Deliberately a
//! separate walk from `engine::Engine`: the engine's FIFO scheduler runs a
//! whole workflow from its single `start_node`, while a request here starts
//! from wherever an `aci` route node sits and only touches its reachable
//! sub-DAG, breadth-first, tolerating individual node failures.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use nodes::{ExecutorInput, NodeRegistry, NodeResult};
use parser::Workflow;
use resolver::{ResolutionContext, Resolver};
use value::Value;

use crate::routes::RouteDef;
use crate::sql_convention::apply_sql_parameter_convention;

const DEFAULT_MAX_EXECUTION_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    PartialSuccess,
    Error,
    SuccessNoOp,
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success => "success",
            ExecutionOutcome::PartialSuccess => "partial_success",
            ExecutionOutcome::Error => "error",
            ExecutionOutcome::SuccessNoOp => "success_no_op",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ExecutionOutcome::Success | ExecutionOutcome::SuccessNoOp => 200,
            ExecutionOutcome::PartialSuccess => 207,
            ExecutionOutcome::Error => 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeTrace {
    pub node_id: String,
    pub node_type: String,
    pub status: String,
    pub message: String,
}

pub struct DispatchOutcome {
    pub outcome: ExecutionOutcome,
    pub message: String,
    pub payload: Value,
    pub trace: Vec<NodeTrace>,
}

/// spec.md §4.7 step 1: "Merge URL path parameters, query string parameters,
/// and (for POST/PUT/PATCH) request body."
pub fn merge_request_data(
    path_params: IndexMap<String, Value>,
    query_params: IndexMap<String, Value>,
    body: Option<Value>,
) -> Value {
    let mut merged = IndexMap::new();
    for (k, v) in query_params {
        merged.insert(k, v);
    }
    for (k, v) in path_params {
        merged.insert(k, v);
    }
    if let Some(Value::Map(body_map)) = body {
        for (k, v) in body_map {
            merged.insert(k, v);
        }
    }
    Value::Map(merged)
}

/// spec.md §4.7 steps 2-4: walk the sub-DAG reachable from `route`'s edges,
/// breadth-first, up to `max_execution_depth` levels.
pub async fn run_route(
    workflow: &Workflow,
    registry: &NodeRegistry,
    route: &RouteDef,
    request_method: &str,
    request_data: Value,
    execution_id: &str,
    max_execution_depth: usize,
) -> DispatchOutcome {
    let max_depth = if max_execution_depth == 0 { DEFAULT_MAX_EXECUTION_DEPTH } else { max_execution_depth };

    let mut resolver = Resolver::new(false);
    let mut ctx = ResolutionContext::new(Value::Null);
    ctx.request_data = request_data.clone();

    let mut executed_node_ids: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = workflow.successors(&route.node_id).iter().map(|s| (s.clone(), 0)).collect();
    for (id, _) in &queue {
        executed_node_ids.insert(id.clone());
    }

    let mut trace = Vec::new();
    let mut payload = Value::Null;
    let mut successes = 0usize;
    let mut failures = 0usize;

    while let Some((node_id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            tracing::warn!("route '{}' hit max_execution_depth ({max_depth}) at node '{node_id}'", route.route_path);
            continue;
        }
        let Some(node_def) = workflow.nodes.get(&node_id) else {
            continue;
        };

        let resolved = match resolver.resolve_value(&Value::Map(node_def.params.clone()), &ctx) {
            Ok(Value::Map(m)) => m,
            Ok(_) => IndexMap::new(),
            Err(e) => {
                failures += 1;
                trace.push(NodeTrace {
                    node_id: node_id.clone(),
                    node_type: node_def.node_type.clone(),
                    status: "error".to_string(),
                    message: format!("placeholder resolution failed: {e}"),
                });
                continue;
            }
        };
        let coerced = engine::coercion::coerce_params(&resolved);
        let params = apply_sql_parameter_convention(&node_def.node_type, &coerced, request_method, &request_data);

        let Some(executor) = registry.get(&node_def.node_type) else {
            failures += 1;
            trace.push(NodeTrace {
                node_id: node_id.clone(),
                node_type: node_def.node_type.clone(),
                status: "error".to_string(),
                message: format!("no executor registered for node type '{}'", node_def.node_type),
            });
            continue;
        };
        let executor: Arc<dyn nodes::ExecutableNode> = Arc::clone(executor);

        let input = ExecutorInput {
            node_type: node_def.node_type.clone(),
            label: String::new(),
            description: String::new(),
            params,
            node_name: node_id.clone(),
            execution_id: execution_id.to_string(),
        };
        let result: NodeResult = executor.execute(input).await;
        ctx.record_result(node_id.clone(), result.to_value());

        trace.push(NodeTrace {
            node_id: node_id.clone(),
            node_type: node_def.node_type.clone(),
            status: match result.status {
                nodes::NodeStatus::Success => "success",
                nodes::NodeStatus::Warning => "warning",
                nodes::NodeStatus::Error => "error",
            }
            .to_string(),
            message: result.message.clone(),
        });

        if result.is_error() {
            failures += 1;
            // spec.md §4.7 step 3: "A failed node does not enqueue its
            // successors but does not abort the whole response."
            continue;
        }
        successes += 1;
        update_payload(&mut payload, &result);

        for succ in workflow.successors(&node_id) {
            if executed_node_ids.insert(succ.clone()) {
                queue.push_back((succ.clone(), depth + 1));
            }
        }
    }

    let outcome = match (successes, failures) {
        (0, 0) => ExecutionOutcome::SuccessNoOp,
        (_, 0) => ExecutionOutcome::Success,
        (0, _) => ExecutionOutcome::Error,
        (_, _) => ExecutionOutcome::PartialSuccess,
    };
    let message = match outcome {
        ExecutionOutcome::Success => format!("route '{}' completed", route.route_path),
        ExecutionOutcome::SuccessNoOp => format!("route '{}' has no downstream nodes", route.route_path),
        ExecutionOutcome::PartialSuccess => format!("route '{}' completed with {failures} failed node(s)", route.route_path),
        ExecutionOutcome::Error => format!("route '{}' failed", route.route_path),
    };

    DispatchOutcome { outcome, message, payload, trace }
}

/// spec.md §4.7 step 4: "prefer the latest successful node's `result`;
/// fall back to `data`, then to `result_text` (merged under key
/// `ai_explanation` into any existing dict payload)."
fn update_payload(current: &mut Value, result: &NodeResult) {
    let mut candidate = if !result.result.is_null() {
        result.result.clone()
    } else if !result.data.is_null() {
        result.data.clone()
    } else {
        Value::Null
    };

    let result_text = result
        .result
        .as_map()
        .and_then(|m| m.get("result_text"))
        .or_else(|| result.data.as_map().and_then(|m| m.get("result_text")))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(text) = result_text {
        match &mut candidate {
            Value::Map(m) => {
                m.insert("ai_explanation".to_string(), Value::String(text));
            }
            Value::Null => {
                let mut m = IndexMap::new();
                m.insert("ai_explanation".to_string(), Value::String(text));
                candidate = Value::Map(m);
            }
            _ => {}
        }
    }

    if !candidate.is_null() {
        *current = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::mock::MockNode;
    use nodes::registry::RegistryBuilder;
    use parser::NodeDef;

    fn route_at(node_id: &str) -> RouteDef {
        RouteDef {
            node_id: node_id.to_string(),
            route_path: "/demo".to_string(),
            tokens: Vec::new(),
            methods: vec!["GET".to_string()],
            handler: "demo".to_string(),
            auth_required: false,
            rate_limit: None,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn route_with_no_edges_is_success_no_op() {
        let wf = Workflow::empty("wf", "trigger");
        let registry = RegistryBuilder::new().build();
        let outcome = run_route(&wf, &registry, &route_at("trigger"), "GET", Value::map(), "exec-1", 50).await;
        assert_eq!(outcome.outcome, ExecutionOutcome::SuccessNoOp);
    }

    #[tokio::test]
    async fn failed_node_is_recorded_but_does_not_abort_siblings() {
        let mut wf = Workflow::empty("wf", "trigger");
        wf.nodes.insert("trigger".to_string(), NodeDef::new("trigger", "aci"));
        wf.nodes.insert("boom".to_string(), NodeDef::new("boom", "boom_mock"));
        wf.nodes.insert("ok".to_string(), NodeDef::new("ok", "ok_mock"));
        wf.edges.insert("trigger".to_string(), vec!["boom".to_string(), "ok".to_string()]);

        let mut builder = RegistryBuilder::new();
        builder.register("boom_mock", Arc::new(MockNode::failing_fatal("boom", "kaboom")));
        builder.register("ok_mock", Arc::new(MockNode::returning("ok", Value::String("done".to_string()))));
        let registry = builder.build();

        let outcome = run_route(&wf, &registry, &route_at("trigger"), "GET", Value::map(), "exec-1", 50).await;
        assert_eq!(outcome.outcome, ExecutionOutcome::PartialSuccess);
        assert_eq!(outcome.trace.len(), 2);
    }

    #[test]
    fn result_text_is_folded_into_ai_explanation_not_replacing_payload() {
        let mut map = IndexMap::new();
        map.insert("value".to_string(), Value::Int(1));
        map.insert("result_text".to_string(), Value::String("explained".to_string()));
        let result = NodeResult::success(Value::Map(map));
        let mut payload = Value::Null;
        update_payload(&mut payload, &result);
        let out = payload.as_map().unwrap();
        assert_eq!(out["value"], Value::Int(1));
        assert_eq!(out["ai_explanation"], Value::String("explained".to_string()));
    }
}
