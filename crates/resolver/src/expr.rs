//! The `{{ … }}` expression grammar and its evaluation — spec.md §4.2.
//!
//! ```text
//! expression  := cond | filtered | funcall | path
//! cond        := path ' if ' path ' else ' path
//! filtered    := path ('|' filter)+
//! filter      := IDENT ( '(' args? ')' )?
//! funcall     := IDENT '(' args? ')'
//! args        := value (',' value)*
//! path        := head ('.' segment | '[' INDEX ']')*
//! head        := IDENT | 'key:' IDENT | literal
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use value::Value;

use crate::context::ResolutionContext;
use crate::fallback::fetch_value;
use crate::filters::FILTERS;
use crate::functions::FUNCTIONS;

static COND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?s)(.+?)\s+if\s+(.+?)\s+else\s+(.+)$").unwrap());
static FUNCALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$").unwrap());
static HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(.*)$").unwrap());

/// Evaluate a full `{{ expr }}` body (without the surrounding braces) against
/// `ctx`. Returns `None` when the expression could not be resolved at all
/// (the caller decides what to do: leave literal / fail / substitute fallback).
pub fn eval(expr: &str, ctx: &ResolutionContext) -> Option<Value> {
    let expr = expr.trim();

    if let Some(caps) = COND_RE.captures(expr) {
        let cond = eval(&caps[1], ctx).unwrap_or(Value::Null);
        return if cond.is_truthy() {
            eval(&caps[2], ctx)
        } else {
            eval(&caps[3], ctx)
        };
    }

    if let Some(parts) = split_top_level(expr, '|') {
        if parts.len() > 1 {
            let base = eval(&parts[0], ctx)?;
            // Single pipe where the right side isn't a recognizable filter
            // call is the `{{ expr | fallback }}` convenience (spec.md §4.2).
            if parts.len() == 2 && !is_filter_call(&parts[1]) {
                return Some(if base.is_null() {
                    parse_literal(&parts[1]).unwrap_or(Value::Null)
                } else {
                    base
                });
            }
            let mut current = base;
            for filter_text in &parts[1..] {
                current = apply_filter(filter_text, &current);
            }
            return Some(current);
        }
    }

    if let Some(caps) = FUNCALL_RE.captures(expr) {
        let name = &caps[1];
        if let Some(func) = FUNCTIONS.get(name) {
            let args = parse_args(&caps[2], ctx);
            return Some(func(&args));
        }
    }

    eval_path(expr, ctx)
}

fn is_filter_call(text: &str) -> bool {
    let text = text.trim();
    let name = text.split('(').next().unwrap_or(text).trim();
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && FILTERS.contains_key(name)
}

fn apply_filter(filter_text: &str, base: &Value) -> Value {
    let filter_text = filter_text.trim();
    let (name, args_text) = match FUNCALL_RE.captures(filter_text) {
        Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
        None => (filter_text.to_string(), None),
    };
    let Some(filter) = FILTERS.get(name.as_str()) else {
        tracing::warn!("unknown filter '{name}'");
        return base.clone();
    };
    let args: Vec<Value> = args_text
        .map(|text| {
            split_top_level(&text, ',')
                .unwrap_or_default()
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_literal(s).unwrap_or(Value::String(s.trim().to_string())))
                .collect()
        })
        .unwrap_or_default();
    filter(base, &args)
}

fn parse_args(text: &str, ctx: &ResolutionContext) -> Vec<Value> {
    split_top_level(text, ',')
        .unwrap_or_default()
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let s = s.trim();
            parse_literal(s).or_else(|| eval_path(s, ctx)).unwrap_or(Value::Null)
        })
        .collect()
}

fn eval_path(path: &str, ctx: &ResolutionContext) -> Option<Value> {
    let path = path.trim();
    if let Some(lit) = parse_literal(path) {
        return Some(lit);
    }
    if let Some(key_name) = path.strip_prefix("key:") {
        return ctx.resolved_keys.get(key_name.trim()).cloned();
    }

    let caps = HEAD_RE.captures(path)?;
    let head = &caps[1];
    let rest = &caps[2];

    match head {
        "input" => value::path::parse_path(rest.trim_start_matches('.'))
            .into_iter()
            .try_fold(ctx.input.clone(), |acc, seg| acc.get_segment(&seg).cloned()),
        "request_data" => value::path::parse_path(rest.trim_start_matches('.'))
            .into_iter()
            .try_fold(ctx.request_data.clone(), |acc, seg| acc.get_segment(&seg).cloned()),
        source_id => fetch_value(ctx, source_id, rest),
    }
}

/// Parse a grammar `literal`: `BOOL | INT | FLOAT | 'null' | '"…"' | "'…'"`.
pub fn parse_literal(text: &str) -> Option<Value> {
    let t = text.trim();
    if t == "null" {
        return Some(Value::Null);
    }
    if t == "true" {
        return Some(Value::Bool(true));
    }
    if t == "false" {
        return Some(Value::Bool(false));
    }
    if t.len() >= 2 {
        let bytes = t.as_bytes();
        if (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
        {
            return Some(Value::String(t[1..t.len() - 1].to_string()));
        }
    }
    if let Ok(i) = t.parse::<i64>() {
        return Some(Value::Int(i));
    }
    if let Ok(f) = t.parse::<f64>() {
        return Some(Value::Float(f));
    }
    None
}

/// Split `text` on `sep` at depth-0 (respecting `()`, `[]`, `{}`, and quotes).
/// Returns `None` if `sep` never occurs at depth 0 (i.e. there's nothing to split).
fn split_top_level(text: &str, sep: char) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    let mut found = false;

    for c in text.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' | '}' => {
                    depth -= 1;
                    current.push(c);
                }
                _ if c == sep && depth == 0 => {
                    found = true;
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    parts.push(current);

    if found {
        Some(parts)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn ctx() -> ResolutionContext {
        let mut ctx = ResolutionContext::new(Value::from(serde_json::json!({"x": 10})));
        let mut results = IndexMap::new();
        results.insert(
            "A".to_string(),
            Value::from(serde_json::json!({"result": {"value": 5}})),
        );
        ctx.node_results = results;
        ctx
    }

    #[test]
    fn path_resolves_against_input() {
        assert_eq!(eval("input.x", &ctx()), Some(Value::Int(10)));
    }

    #[test]
    fn path_resolves_node_result_via_robust_fallback() {
        assert_eq!(eval("A.value", &ctx()), Some(Value::Int(5)));
    }

    #[test]
    fn filters_apply_left_to_right() {
        assert_eq!(
            eval("'hello world' | upper | length", &ctx()),
            Some(Value::Int(11))
        );
    }

    #[test]
    fn fallback_pipe_used_when_base_is_null() {
        assert_eq!(eval("A.missing | 42", &ctx()), Some(Value::Int(42)));
    }

    #[test]
    fn cond_picks_the_matching_branch() {
        assert_eq!(eval("'yes' if input.x else 'no'", &ctx()), Some(Value::String("yes".into())));
    }

    #[test]
    fn funcall_dispatches_to_function_registry() {
        assert_eq!(eval("range(0, 3)", &ctx()), Some(Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn key_prefixed_head_reads_resolved_keys() {
        let mut c = ctx();
        c.resolved_keys.insert("short".to_string(), Value::String("bound".into()));
        assert_eq!(eval("key:short", &c), Some(Value::String("bound".into())));
    }
}
