//! Runtime placeholder resolution — spec.md §4.2.
//!
//! Grounded in `execution_manager.py`'s `resolve_placeholder_string` /
//! `_resolve_single_placeholder_content` (memoization, cycle detection,
//! "full match vs partial replacement" distinction) and `actfile_parser.py`'s
//! `AdvancedPlaceholderResolver` (filters, functions, block forms). Prefers
//! `&mut self` over `RefCell` for the cache/cycle-stack, since nothing here
//! needs to be shared across threads the way the teacher's registries are.

pub mod blocks;
pub mod context;
pub mod error;
pub mod expr;
pub mod fallback;
pub mod filters;
pub mod functions;

pub use context::ResolutionContext;
pub use error::ResolverError;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use value::Value;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}|\$\{[^}]*\}").unwrap());
static SOLE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\{\{.*\}\}|\$\{[^}]*\})$").unwrap());

/// Resolves `{{expr}}`/`${ENV}` text against a [`ResolutionContext`] for the
/// duration of one execution. Owns the memoization cache and cycle stack, so
/// a fresh `Resolver` per execution is the expected usage (matching
/// `ExecutionState`'s per-run ownership, spec.md §5).
pub struct Resolver {
    fail_on_unresolved: bool,
    cache: HashMap<String, Value>,
    stack: HashSet<String>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_resolved: u64,
}

impl Resolver {
    pub fn new(fail_on_unresolved: bool) -> Self {
        Self {
            fail_on_unresolved,
            cache: HashMap::new(),
            stack: HashSet::new(),
            cache_hits: 0,
            cache_misses: 0,
            total_resolved: 0,
        }
    }

    /// Resolve every `{{ … }}`/`${ … }` token in `text`. A string containing
    /// exactly one token and no surrounding text resolves to the native
    /// `Value`; otherwise each token is replaced by its string form and the
    /// result is a `String`.
    pub fn resolve_string(&mut self, text: &str, ctx: &ResolutionContext) -> Result<Value, ResolverError> {
        let expanded = blocks::expand(text, ctx)?;

        if SOLE_TOKEN_RE.is_match(expanded.trim()) {
            return self.resolve_token(expanded.trim(), ctx);
        }

        if !TOKEN_RE.is_match(&expanded) {
            return Ok(Value::String(expanded));
        }

        let mut result = String::new();
        let mut last = 0;
        for m in TOKEN_RE.find_iter(&expanded) {
            result.push_str(&expanded[last..m.start()]);
            let resolved = self.resolve_token(m.as_str(), ctx)?;
            result.push_str(&resolved.stringify());
            last = m.end();
        }
        result.push_str(&expanded[last..]);
        Ok(Value::String(result))
    }

    /// Deep-resolve every `String`/`Placeholder` leaf of a `Value` tree —
    /// used by the engine to resolve a whole node's `params` map at once.
    pub fn resolve_value(&mut self, value: &Value, ctx: &ResolutionContext) -> Result<Value, ResolverError> {
        match value {
            Value::String(s) => self.resolve_string(s, ctx),
            Value::Placeholder(raw) => self.resolve_string(raw, ctx),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.resolve_value(item, ctx)?);
                }
                Ok(Value::List(out))
            }
            Value::Map(map) => {
                let mut out = indexmap::IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(v, ctx)?);
                }
                Ok(Value::Map(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_token(&mut self, raw_token: &str, ctx: &ResolutionContext) -> Result<Value, ResolverError> {
        if let Some(cached) = self.cache.get(raw_token) {
            self.cache_hits += 1;
            return Ok(cached.clone());
        }

        if self.stack.contains(raw_token) {
            return Err(ResolverError::PlaceholderCycle(raw_token.to_string()));
        }
        self.stack.insert(raw_token.to_string());
        self.cache_misses += 1;

        let outcome = self.evaluate_token(raw_token, ctx);
        self.stack.remove(raw_token);

        match outcome {
            Ok(Some(value)) => {
                self.total_resolved += 1;
                self.cache.insert(raw_token.to_string(), value.clone());
                Ok(value)
            }
            Ok(None) => {
                if self.fail_on_unresolved {
                    Err(ResolverError::Unresolved(raw_token.to_string()))
                } else {
                    tracing::warn!("leaving unresolved placeholder: {raw_token}");
                    Ok(Value::Placeholder(raw_token.to_string()))
                }
            }
            Err(e) => Err(e),
        }
    }

    fn evaluate_token(
        &mut self,
        raw_token: &str,
        ctx: &ResolutionContext,
    ) -> Result<Option<Value>, ResolverError> {
        let resolved = if let Some(var_name) = raw_token.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            std::env::var(var_name.trim()).ok().map(Value::String)
        } else if let Some(inner) = raw_token.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
            expr::eval(inner, ctx)
        } else {
            None
        };

        match resolved {
            Some(Value::Placeholder(inner_raw)) if inner_raw != raw_token => {
                self.resolve_token(&inner_raw, ctx).map(Some)
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_input(input: serde_json::Value) -> ResolutionContext {
        ResolutionContext::new(Value::from(input))
    }

    #[test]
    fn sole_token_resolves_to_native_value() {
        let mut r = Resolver::new(false);
        let ctx = ctx_with_input(serde_json::json!({"count": 3}));
        assert_eq!(r.resolve_string("{{input.count}}", &ctx).unwrap(), Value::Int(3));
    }

    #[test]
    fn partial_replacement_stringifies_into_a_string() {
        let mut r = Resolver::new(false);
        let ctx = ctx_with_input(serde_json::json!({"count": 3}));
        assert_eq!(
            r.resolve_string("count={{input.count}}!", &ctx).unwrap(),
            Value::String("count=3!".to_string())
        );
    }

    #[test]
    fn repeated_token_hits_cache() {
        let mut r = Resolver::new(false);
        let ctx = ctx_with_input(serde_json::json!({"count": 3}));
        r.resolve_string("{{input.count}}", &ctx).unwrap();
        r.resolve_string("{{input.count}}", &ctx).unwrap();
        assert_eq!(r.cache_hits, 1);
        assert_eq!(r.cache_misses, 1);
    }

    #[test]
    fn unresolved_token_left_in_place_by_default() {
        let mut r = Resolver::new(false);
        let ctx = ResolutionContext::new(Value::Null);
        let result = r.resolve_string("{{Ghost.value}}", &ctx).unwrap();
        assert_eq!(result, Value::Placeholder("{{Ghost.value}}".to_string()));
    }

    #[test]
    fn fail_on_unresolved_escalates_to_error() {
        let mut r = Resolver::new(true);
        let ctx = ResolutionContext::new(Value::Null);
        let err = r.resolve_string("{{Ghost.value}}", &ctx).unwrap_err();
        assert!(matches!(err, ResolverError::Unresolved(_)));
    }

    #[test]
    fn env_token_resolves_from_process_environment() {
        std::env::set_var("RESOLVER_TEST_VAR", "hi");
        let mut r = Resolver::new(false);
        let ctx = ResolutionContext::new(Value::Null);
        assert_eq!(
            r.resolve_string("${RESOLVER_TEST_VAR}", &ctx).unwrap(),
            Value::String("hi".to_string())
        );
    }

    #[test]
    fn cyclic_key_reference_is_detected() {
        let mut r = Resolver::new(false);
        let mut ctx = ResolutionContext::new(Value::Null);
        ctx.resolved_keys.insert("a".to_string(), Value::Placeholder("{{key:b}}".to_string()));
        ctx.resolved_keys.insert("b".to_string(), Value::Placeholder("{{key:a}}".to_string()));
        let err = r.resolve_string("{{key:a}}", &ctx).unwrap_err();
        assert!(matches!(err, ResolverError::PlaceholderCycle(_)));
    }
}
