//! Type coercion pass — spec.md §4.5.1: runs after placeholder resolution,
//! before the executor sees `params`. Walks one level deep; never recurses
//! into nested maps/lists since the resolver has already turned
//! nested-template leaves into native values where it could.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use value::Value;

/// Keys whose string value is worth a JSON-decode attempt even without a
/// leading `[`/`{` — spec.md §4.5.1's named-key exception list.
const JSON_HINT_KEYS: &[&str] = &[
    "messages", "json_body", "data", "payload", "headers", "items", "list", "options", "config",
    "arguments", "parameters",
];

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+\.\d+|\.\d+|\d+\.)([eE]-?\d+)?$|^-?\d+[eE]-?\d+$").unwrap());

pub fn coerce_params(params: &IndexMap<String, Value>) -> IndexMap<String, Value> {
    params.iter().map(|(k, v)| (k.clone(), coerce_one(k, v))).collect()
}

fn coerce_one(key: &str, value: &Value) -> Value {
    let Value::String(s) = value else { return value.clone() };

    // An unresolved placeholder is left untouched.
    if s.starts_with("{{") && s.ends_with("}}") || s.starts_with("${") && s.ends_with('}') {
        return value.clone();
    }

    let lower = s.to_lowercase();
    if lower == "true" {
        return Value::Bool(true);
    }
    if lower == "false" {
        return Value::Bool(false);
    }
    if INT_RE.is_match(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
    }
    if FLOAT_RE.is_match(s) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    let looks_like_json = (s.starts_with('[') && s.ends_with(']')) || (s.starts_with('{') && s.ends_with('}'));
    if looks_like_json || JSON_HINT_KEYS.contains(&key) {
        if let Ok(decoded) = serde_json::from_str::<serde_json::Value>(s) {
            return Value::from(decoded);
        }
    }

    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
    }

    #[test]
    fn recognizes_booleans_and_numbers() {
        let out = coerce_params(&params(&[("a", "true"), ("b", "42"), ("c", "3.5")]));
        assert_eq!(out["a"], Value::Bool(true));
        assert_eq!(out["b"], Value::Int(42));
        assert_eq!(out["c"], Value::Float(3.5));
    }

    #[test]
    fn decodes_bracketed_json() {
        let out = coerce_params(&params(&[("items", "[1, 2, 3]")]));
        assert_eq!(out["items"], Value::from(serde_json::json!([1, 2, 3])));
    }

    #[test]
    fn hint_keys_decode_json_without_brackets_requirement() {
        let out = coerce_params(&params(&[("headers", "{\"x\":1}")]));
        assert_eq!(out["headers"], Value::from(serde_json::json!({"x": 1})));
    }

    #[test]
    fn unresolved_placeholder_is_left_untouched() {
        let out = coerce_params(&params(&[("a", "{{Node.result}}")]));
        assert_eq!(out["a"], Value::String("{{Node.result}}".to_string()));
    }

    #[test]
    fn plain_string_is_left_as_a_string() {
        let out = coerce_params(&params(&[("name", "hello world")]));
        assert_eq!(out["name"], Value::String("hello world".to_string()));
    }
}
