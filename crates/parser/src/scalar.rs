//! Scalar value coercion for `key = value` lines — spec.md §4.1 rule list.

use once_cell::sync::Lazy;
use regex::Regex;
use value::Value;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(\d+\.\d+|\.\d+|\d+\.)([eE]-?\d+)?$|^-?\d+[eE]-?\d+$").unwrap()
});
static SOLE_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\{\{.*\}\}|\$\{[^}]*\})$").unwrap());

/// Parse a raw `key = value` right-hand side per spec.md §4.1 steps 1-6.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();

    // 1. Sole placeholder.
    if SOLE_PLACEHOLDER_RE.is_match(trimmed) {
        return Value::Placeholder(trimmed.to_string());
    }

    // 2. JSON list/map.
    if (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
    {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return Value::from(json);
        }
        // Falls through to String on decode failure, per spec.
    }

    // 3. Bool (case-insensitive).
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    // 4. Int / Float.
    if INT_RE.is_match(trimmed) {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
    }
    if FLOAT_RE.is_match(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
    }

    // 5. Quoted string (strip matching quotes, length >= 2).
    if trimmed.len() >= 2 {
        let bytes = trimmed.as_bytes();
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return Value::String(trimmed[1..trimmed.len() - 1].to_string());
        }
    }

    // 6. Plain string.
    Value::String(trimmed.to_string())
}

/// Does this already-parsed-as-string value look like an unresolved placeholder
/// token? Used by the type-coercion pass (engine §4.5.1) to skip coercing it.
pub fn looks_like_placeholder(s: &str) -> bool {
    SOLE_PLACEHOLDER_RE.is_match(s.trim()) || s.contains("{{") || s.contains("${")
}
