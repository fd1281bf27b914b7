//! Static substitution pass — spec.md §4.1 "Static substitution pass".
//!
//! Run once, right after sectioning, over every section except `[parameters]`
//! and `[env]`: replaces `{{.Parameter.NAME}}` and `${ENV}` tokens found
//! inside any `String`/`Placeholder` leaf. Distinct from the resolver's
//! runtime phase (spec.md §4.2), which only ever sees the result of this pass.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use value::Value;

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\.Parameter\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());
static ENV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").unwrap());

/// Apply the static pass to a single text fragment, returning the
/// substituted text and whether anything changed.
pub fn substitute_text(text: &str, parameters: &IndexMap<String, Value>) -> (String, bool) {
    let mut changed = false;

    let after_params = PARAM_RE.replace_all(text, |caps: &regex::Captures| {
        let name = &caps[1];
        match parameters.get(name) {
            Some(v) => {
                changed = true;
                v.stringify()
            }
            None => {
                tracing::warn!("static substitution: parameter '{name}' not found");
                caps[0].to_string()
            }
        }
    });

    let after_env = ENV_RE.replace_all(&after_params, |caps: &regex::Captures| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(v) => {
                changed = true;
                v
            }
            Err(_) => {
                tracing::warn!("static substitution: env var '{name}' not found");
                caps[0].to_string()
            }
        }
    });

    (after_env.into_owned(), changed)
}

/// Recursively apply the static pass to every String/Placeholder leaf of a `Value`.
pub fn substitute_value(value: &mut Value, parameters: &IndexMap<String, Value>) {
    match value {
        Value::String(s) => {
            let (new_s, changed) = substitute_text(s, parameters);
            if changed {
                *value = Value::String(new_s);
            }
        }
        Value::Placeholder(raw) => {
            let (new_s, changed) = substitute_text(raw, parameters);
            if changed {
                *value = Value::String(new_s);
            }
        }
        Value::List(items) => {
            for item in items {
                substitute_value(item, parameters);
            }
        }
        Value::Map(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, parameters);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_parameter() {
        let mut params = IndexMap::new();
        params.insert("base_url".to_string(), Value::String("https://x".into()));
        let (out, changed) = substitute_text("url={{.Parameter.base_url}}/path", &params);
        assert!(changed);
        assert_eq!(out, "url=https://x/path");
    }

    #[test]
    fn leaves_unknown_parameter_token_unchanged() {
        let params = IndexMap::new();
        let (out, changed) = substitute_text("{{.Parameter.missing}}", &params);
        assert!(!changed);
        assert_eq!(out, "{{.Parameter.missing}}");
    }

    #[test]
    fn whole_value_placeholder_becomes_string() {
        let mut params = IndexMap::new();
        params.insert("k".to_string(), Value::Int(7));
        let mut v = Value::Placeholder("{{.Parameter.k}}".to_string());
        substitute_value(&mut v, &params);
        assert_eq!(v, Value::String("7".to_string()));
    }
}
