//! The "robust fallback" NodeId path lookup — spec.md §4.2, ported from
//! `execution_manager.py`'s `fetch_value`/`_traverse_path` (lines 2061-2237).

use value::path::{parse_path, PathSegment};
use value::Value;

use crate::context::ResolutionContext;

/// Resolve `source_id.path` against the current context, trying four
/// strategies in order before giving up. `source_id` is either `"input"` or
/// a NodeId present in `ctx.node_results`.
pub fn fetch_value(ctx: &ResolutionContext, source_id: &str, path: &str) -> Option<Value> {
    let base: &Value = if source_id == "input" {
        &ctx.input
    } else {
        ctx.node_results.get(source_id)?
    };

    let segments = parse_path(path);
    if segments.is_empty() {
        return Some(base.clone());
    }

    // Strategy 1: the literal path.
    if let Some(v) = traverse_path(base, &segments) {
        return Some(v.clone());
    }

    let first_is_result = matches!(&segments[0], PathSegment::Key(k) if k == "result");

    // Strategy 2: path starts with `result.` — strip it and retry.
    if first_is_result && segments.len() > 1 {
        if let Some(v) = traverse_path(base, &segments[1..]) {
            return Some(v.clone());
        }
    }

    // Strategy 3: path doesn't start with `result` — prepend it and retry.
    if !first_is_result {
        let mut prefixed = Vec::with_capacity(segments.len() + 1);
        prefixed.push(PathSegment::Key("result".to_string()));
        prefixed.extend(segments.iter().cloned());
        if let Some(v) = traverse_path(base, &prefixed) {
            return Some(v.clone());
        }
    }

    // Strategy 4: one-step direct access into base["result"][first].
    let result_key = PathSegment::Key("result".to_string());
    if let Some(result_value) = base.get_segment(&result_key) {
        if let Some(v) = result_value.get_segment(&segments[0]) {
            return Some(v.clone());
        }
    }

    None
}

/// Walk a full path from `base`, short-circuiting on the first miss.
pub fn traverse_path<'a>(base: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    base.get_path(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(node_id: &str, result: serde_json::Value) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(Value::Null);
        ctx.record_result(node_id, Value::from(result));
        ctx
    }

    #[test]
    fn strategy_one_literal_path() {
        let ctx = ctx_with("A", json!({"result": {"value": 42}}));
        assert_eq!(fetch_value(&ctx, "A", "result.value"), Some(Value::Int(42)));
    }

    #[test]
    fn strategy_two_strips_leading_result() {
        let ctx = ctx_with("A", json!({"value": 42}));
        assert_eq!(fetch_value(&ctx, "A", "result.value"), Some(Value::Int(42)));
    }

    #[test]
    fn strategy_three_prepends_result() {
        let ctx = ctx_with("A", json!({"result": {"value": 42}}));
        assert_eq!(fetch_value(&ctx, "A", "value"), Some(Value::Int(42)));
    }

    #[test]
    fn strategy_four_direct_result_access() {
        let ctx = ctx_with("A", json!({"result": {"value": 42}}));
        assert_eq!(fetch_value(&ctx, "A", "value.ignored.deeper"), Some(Value::Int(42)));
    }

    #[test]
    fn missing_source_is_none() {
        let ctx = ResolutionContext::new(Value::Null);
        assert_eq!(fetch_value(&ctx, "Ghost", "value"), None);
    }
}
