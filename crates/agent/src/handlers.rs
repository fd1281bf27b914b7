//! Fixed endpoints (spec.md §6.4) plus the dynamic-route catch-all and the
//! two debug endpoints supplementing the original's `execute_workflow`/
//! `execute_node` (SPEC_FULL.md §6).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use indexmap::IndexMap;
use nodes::ExecutorInput;
use value::Value;

use crate::dispatch::{merge_request_data, run_route, NodeTrace};
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut map = IndexMap::new();
    map.insert("agent_name".to_string(), Value::String(state.agent_name.clone()));
    map.insert("version".to_string(), Value::String(state.version.clone()));
    map.insert("status".to_string(), Value::String("ok".to_string()));
    map.insert("node_count".to_string(), Value::Int(state.workflow.nodes.len() as i64));
    map.insert("route_count".to_string(), Value::Int(state.routes.len() as i64));
    map.insert("uptime_seconds".to_string(), Value::Int((Utc::now() - state.started_at).num_seconds()));
    Json(Value::Map(map))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let mut map = IndexMap::new();
    map.insert("workflow_name".to_string(), Value::String(state.workflow.name.clone()));
    map.insert("start_node".to_string(), Value::String(state.workflow.start_node.clone()));
    map.insert("node_count".to_string(), Value::Int(state.workflow.nodes.len() as i64));
    map.insert("edge_count".to_string(), Value::Int(state.workflow.edges.len() as i64));
    map.insert("registered_routes".to_string(), Value::Int(state.routes.len() as i64));
    map.insert("started_at".to_string(), Value::String(state.started_at.to_rfc3339()));
    Json(Value::Map(map))
}

pub async fn admin_nodes(State(state): State<AppState>) -> Json<Value> {
    let list = state
        .workflow
        .nodes
        .values()
        .map(|n| {
            let mut m = IndexMap::new();
            m.insert("id".to_string(), Value::String(n.id.clone()));
            m.insert("node_type".to_string(), Value::String(n.node_type.clone()));
            m.insert("params".to_string(), Value::Map(n.params.clone()));
            Value::Map(m)
        })
        .collect();
    Json(Value::List(list))
}

pub async fn admin_edges(State(state): State<AppState>) -> Json<Value> {
    let map = state
        .workflow
        .edges
        .iter()
        .map(|(k, v)| (k.clone(), Value::List(v.iter().map(|s| Value::String(s.clone())).collect())))
        .collect();
    Json(Value::Map(map))
}

pub async fn aci_info(State(state): State<AppState>) -> Json<Value> {
    let list = state
        .routes
        .iter()
        .map(|r| {
            let mut m = IndexMap::new();
            m.insert("node_id".to_string(), Value::String(r.node_id.clone()));
            m.insert("route_path".to_string(), Value::String(r.route_path.clone()));
            m.insert("methods".to_string(), Value::List(r.methods.iter().map(|s| Value::String(s.clone())).collect()));
            m.insert("handler".to_string(), Value::String(r.handler.clone()));
            m.insert("auth_required".to_string(), Value::Bool(r.auth_required));
            m.insert("description".to_string(), Value::String(r.description.clone()));
            Value::Map(m)
        })
        .collect();
    Json(Value::List(list))
}

pub async fn admin_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let mut rows = String::new();
    for route in state.routes.iter() {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            route.route_path,
            route.methods.join(", "),
            route.node_id,
            route.handler
        ));
    }
    let html = format!(
        "<html><head><title>{name} — admin dashboard</title></head><body>\
         <h1>{name}</h1><p>{node_count} nodes, {edge_count} edges, {route_count} routes</p>\
         <table border=\"1\"><tr><th>path</th><th>methods</th><th>node</th><th>handler</th></tr>\n{rows}</table>\
         </body></html>",
        name = state.workflow.name,
        node_count = state.workflow.nodes.len(),
        edge_count = state.workflow.edges.len(),
        route_count = state.routes.len(),
        rows = rows,
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn trace_to_value(trace: &[NodeTrace]) -> Value {
    Value::List(
        trace
            .iter()
            .map(|t| {
                let mut m = IndexMap::new();
                m.insert("node_id".to_string(), Value::String(t.node_id.clone()));
                m.insert("node_type".to_string(), Value::String(t.node_type.clone()));
                m.insert("status".to_string(), Value::String(t.status.clone()));
                m.insert("message".to_string(), Value::String(t.message.clone()));
                Value::Map(m)
            })
            .collect(),
    )
}

fn parse_body(method: &Method, headers: &HeaderMap, body: &[u8]) -> Option<Value> {
    if !matches!(method.as_str(), "POST" | "PUT" | "PATCH") || body.is_empty() {
        return None;
    }
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    if content_type.contains("application/x-www-form-urlencoded") {
        let parsed: IndexMap<String, String> = serde_urlencoded::from_bytes(body).ok()?;
        Some(Value::Map(parsed.into_iter().map(|(k, v)| (k, Value::String(v))).collect()))
    } else {
        serde_json::from_slice::<serde_json::Value>(body).ok().map(Value::from)
    }
}

/// spec.md §4.7 steps 1-5, wired to a live HTTP request. Matched against
/// `AppState::routes` by hand since the axum `Router` itself is built once
/// at startup from a single `/*path` catch-all.
pub async fn dynamic_dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<IndexMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(route) = state.routes.iter().find(|r| r.matches(&path).is_some() && r.methods.iter().any(|m| m == method.as_str()))
    else {
        let mut m = IndexMap::new();
        m.insert("execution_outcome".to_string(), Value::String("error".to_string()));
        m.insert("message".to_string(), Value::String(format!("no route matches {method} /{path}")));
        return (StatusCode::NOT_FOUND, Json(Value::Map(m)));
    };
    let path_params = route.matches(&path).unwrap_or_default();
    let query_params: IndexMap<String, Value> = query.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    let body_value = parse_body(&method, &headers, &body);
    let request_data = merge_request_data(path_params, query_params, body_value);

    let execution_id = uuid::Uuid::new_v4().to_string();
    let outcome = run_route(
        &state.workflow,
        &state.registry,
        route,
        method.as_str(),
        request_data,
        &execution_id,
        state.max_execution_depth,
    )
    .await;

    let mut response = IndexMap::new();
    response.insert("agent_name".to_string(), Value::String(state.agent_name.clone()));
    response.insert("route_handler_name".to_string(), Value::String(route.handler.clone()));
    response.insert("aci_node_id_defining_route".to_string(), Value::String(route.node_id.clone()));
    response.insert("request_timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
    response.insert("execution_outcome".to_string(), Value::String(outcome.outcome.as_str().to_string()));
    response.insert("message".to_string(), Value::String(outcome.message.clone()));
    response.insert("payload".to_string(), outcome.payload.clone());
    response.insert("workflow_execution_trace".to_string(), trace_to_value(&outcome.trace));

    let status = StatusCode::from_u16(outcome.outcome.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(Value::Map(response)))
}

/// Supplement (SPEC_FULL.md §6): manual trigger of the whole workflow from
/// its `start_node`, mirroring the original's `execute_workflow` debug call.
pub async fn admin_execute(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let input = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<serde_json::Value>(&body).map(Value::from).unwrap_or(Value::Null)
    };

    let workflow = (*state.workflow).clone();
    let registry = (*state.registry).clone();
    let mut engine = match engine::Engine::new(workflow, registry, engine::EngineConfig::default()) {
        Ok(e) => e,
        Err(e) => {
            let mut m = IndexMap::new();
            m.insert("status".to_string(), Value::String("error".to_string()));
            m.insert("message".to_string(), Value::String(e.to_string()));
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Map(m)));
        }
    };
    let mut run_state = engine::ExecutionState::new(uuid::Uuid::new_v4());
    let result = engine.execute(input, &mut run_state).await;
    let status = match result.outcome {
        engine::RunOutcome::Success => StatusCode::OK,
        engine::RunOutcome::Paused { .. } => StatusCode::ACCEPTED,
        engine::RunOutcome::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(result.to_value()))
}

/// Supplement: single-node execution for debugging, mirroring the
/// original's `execute_node` (SPEC_FULL.md §6).
pub async fn admin_execute_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let Some(node_def) = state.workflow.nodes.get(&node_id) else {
        let mut m = IndexMap::new();
        m.insert("message".to_string(), Value::String(format!("unknown node '{node_id}'")));
        return (StatusCode::NOT_FOUND, Json(Value::Map(m)));
    };
    let Some(executor) = state.registry.get(&node_def.node_type) else {
        let mut m = IndexMap::new();
        m.insert("message".to_string(), Value::String(format!("no executor for node type '{}'", node_def.node_type)));
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Map(m)));
    };
    let executor = Arc::clone(executor);

    let mut params = node_def.params.clone();
    if !body.is_empty() {
        if let Ok(serde_json::Value::Object(overrides)) = serde_json::from_slice(&body) {
            for (k, v) in overrides {
                params.insert(k, Value::from(v));
            }
        }
    }

    let input = ExecutorInput {
        node_type: node_def.node_type.clone(),
        label: String::new(),
        description: String::new(),
        params,
        node_name: node_id.clone(),
        execution_id: uuid::Uuid::new_v4().to_string(),
    };
    let result = executor.execute(input).await;
    let status = if result.is_error() { StatusCode::INTERNAL_SERVER_ERROR } else { StatusCode::OK };
    (status, Json(result.to_value()))
}

