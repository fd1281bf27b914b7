//! End-to-end execution-manager tests, adapted from the teacher's
//! `executor_tests.rs` (MockNode-driven pipeline tests) onto the new
//! `Engine`/`ExecutionState` pair.

use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;
use value::Value;

use nodes::mock::MockNode;
use nodes::registry::RegistryBuilder;
use parser::{NodeDef, Workflow};

use crate::scheduler::{Engine, EngineConfig, RunOutcome};
use crate::state::ExecutionState;

fn fast_config() -> EngineConfig {
    EngineConfig { max_retries_per_node: 0, ..EngineConfig::default() }
}

/// Build a workflow wiring `(id, node_type)` pairs linearly in order.
fn chain(nodes: &[(&str, &str)]) -> Workflow {
    let mut wf = Workflow::empty("test", nodes[0].0);
    for (id, node_type) in nodes {
        wf.nodes.insert(id.to_string(), NodeDef::new(*id, *node_type));
    }
    for pair in nodes.windows(2) {
        wf.edges.insert(pair[0].0.to_string(), vec![pair[1].0.to_string()]);
    }
    wf
}

#[tokio::test]
async fn three_node_pipeline_runs_in_order_and_stores_results() {
    let wf = chain(&[("a", "mock"), ("b", "mock"), ("c", "mock")]);
    let mock = Arc::new(MockNode::returning("step", Value::map()));
    let mut builder = RegistryBuilder::new();
    builder.register("mock", mock.clone());

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.results.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn fatal_node_error_aborts_the_run_fail_fast() {
    let wf = chain(&[("ok", "ok_mock"), ("boom", "boom_mock"), ("never", "never_mock")]);
    let never = Arc::new(MockNode::returning("never", Value::map()));
    let mut builder = RegistryBuilder::new();
    builder.register("ok_mock", Arc::new(MockNode::returning("ok", Value::map())));
    builder.register("boom_mock", Arc::new(MockNode::failing_fatal("boom", "kaboom")));
    builder.register("never_mock", never.clone());

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Error);
    assert_eq!(never.call_count(), 0);
    assert!(state.executed.contains("ok"));
    assert!(state.executed.contains("boom"));
    assert!(!state.executed.contains("never"));
}

#[tokio::test(start_paused = true)]
async fn retryable_node_error_is_retried_then_exhausts() {
    let wf = chain(&[("flaky", "flaky_mock")]);
    let flaky = Arc::new(MockNode::failing_retryable("flaky", "transient failure"));
    let mut builder = RegistryBuilder::new();
    builder.register("flaky_mock", flaky.clone());

    let config = EngineConfig { max_retries_per_node: 2, ..EngineConfig::default() };
    let mut engine = Engine::new(wf, builder.build(), config).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Error);
    // max_retries_per_node(2) + 1 initial attempt = 3 total calls.
    assert_eq!(flaky.call_count(), 3);
    assert_eq!(state.metrics.retry_counts["flaky"], 2);
}

#[tokio::test]
async fn validation_error_is_not_retried() {
    let wf = chain(&[("bad", "set")]);
    let mut builder = RegistryBuilder::new();
    nodes::builtin::register_builtins(&mut builder);

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    // `set` requires a `key` param; omitting it is a validation failure.
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Error);
    assert_eq!(state.metrics.retry_counts.get("bad"), None);
}

#[tokio::test]
async fn if_node_true_branch_enqueues_the_first_edge_only() {
    let mut wf = chain(&[("cond", "if")]);
    wf.nodes.insert("yes".to_string(), NodeDef::new("yes", "noop"));
    wf.nodes.insert("no".to_string(), NodeDef::new("no", "noop"));
    wf.edges.insert("cond".to_string(), vec!["yes".to_string(), "no".to_string()]);
    let mut cond_params = IndexMap::new();
    cond_params.insert("value1".to_string(), Value::Int(1));
    cond_params.insert("value2".to_string(), Value::Int(1));
    cond_params.insert("operator".to_string(), Value::String("eq".to_string()));
    wf.nodes.get_mut("cond").unwrap().params = cond_params;

    let mut builder = RegistryBuilder::new();
    nodes::builtin::register_builtins(&mut builder);

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert!(state.executed.contains("yes"));
    assert!(!state.executed.contains("no"));
}

#[tokio::test]
async fn switch_node_routes_to_the_selected_case() {
    let mut wf = chain(&[("route", "switch")]);
    wf.nodes.insert("a_branch".to_string(), NodeDef::new("a_branch", "noop"));
    wf.nodes.insert("default_branch".to_string(), NodeDef::new("default_branch", "noop"));
    wf.edges.insert("route".to_string(), vec!["a_branch".to_string(), "default_branch".to_string()]);
    let mut cases = IndexMap::new();
    cases.insert("a".to_string(), Value::String("a_branch".to_string()));
    cases.insert("default".to_string(), Value::String("default_branch".to_string()));
    let mut params = IndexMap::new();
    params.insert("value".to_string(), Value::String("a".to_string()));
    params.insert("cases".to_string(), Value::Map(cases));
    wf.nodes.get_mut("route").unwrap().params = params;

    let mut builder = RegistryBuilder::new();
    nodes::builtin::register_builtins(&mut builder);

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert!(state.executed.contains("a_branch"));
    assert!(!state.executed.contains("default_branch"));
}

#[tokio::test]
async fn set_node_populates_resolved_keys() {
    let mut wf = chain(&[("stash", "set")]);
    let mut params = IndexMap::new();
    params.insert("key".to_string(), Value::String("greeting".to_string()));
    params.insert("value".to_string(), Value::String("hello".to_string()));
    wf.nodes.get_mut("stash").unwrap().params = params;

    let mut builder = RegistryBuilder::new();
    nodes::builtin::register_builtins(&mut builder);

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let mut state = ExecutionState::new(Uuid::new_v4());
    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(state.resolved_keys["greeting"], Value::String("hello".to_string()));
}

#[tokio::test]
async fn checkpoint_resume_skips_already_executed_nodes() {
    let wf = chain(&[("a", "mock"), ("b", "mock")]);
    let mock = Arc::new(MockNode::returning("step", Value::map()));
    let mut builder = RegistryBuilder::new();
    builder.register("mock", mock.clone());

    let mut engine = Engine::new(wf, builder.build(), fast_config()).unwrap();
    let execution_id = Uuid::new_v4();
    let mut state = ExecutionState::new(execution_id);
    state.record_result("a", nodes::NodeResult::success(Value::map()));
    state.mark_status("a", crate::state::NodeStatusKind::Success, "ok");

    let result = engine.execute(Value::Null, &mut state).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    // 'a' was pre-seeded as executed, so only 'b' actually invoked the mock.
    assert_eq!(mock.call_count(), 1);
    assert!(state.executed.contains("b"));
}

#[test]
fn unknown_node_type_is_a_fatal_load_error() {
    let wf = chain(&[("a", "does_not_exist")]);
    let builder = RegistryBuilder::new();
    let result = Engine::new(wf, builder.build(), fast_config());
    assert!(result.is_err());
}
