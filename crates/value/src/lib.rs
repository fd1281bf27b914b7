//! The `Value` tagged variant — the one runtime representation shared by the
//! Actfile parser, the placeholder resolver, and every node executor.
//!
//! Scalars and collections mirror JSON exactly; `Placeholder` is the one
//! addition, carrying a raw `{{...}}`/`${...}` token verbatim until something
//! resolves it. Resolved values never contain a `Placeholder`.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

pub mod path;

pub use path::PathSegment;

/// A parsed scalar, collection, or still-unresolved placeholder token.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Raw `{{...}}` or `${...}` source text that survived parsing unresolved.
    Placeholder(String),
}

impl Value {
    pub fn map() -> Value {
        Value::Map(IndexMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Truthiness used by conditional branches and the `bool` filter: `null`,
    /// `false`, `0`, `0.0`, `""`, empty list/map are falsy; everything else
    /// (including `Placeholder`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Placeholder(_) => true,
        }
    }

    /// Look up a single path segment (dict key, then list index, then miss).
    /// `null`/missing short-circuits to `None` per spec.
    pub fn get_segment(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Map(m), PathSegment::Key(k)) => m.get(k.as_str()),
            (Value::List(l), PathSegment::Index(i)) => {
                let idx = if *i < 0 { None } else { Some(*i as usize) };
                idx.and_then(|idx| l.get(idx))
            }
            // A numeric segment against a map is also tried as a string key
            // (e.g. `{{node.0}}` meaning map key "0").
            (Value::Map(m), PathSegment::Index(i)) => m.get(&i.to_string()),
            _ => None,
        }
    }

    /// Walk a full path from this value, short-circuiting on the first miss.
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&Value> {
        let mut current = self;
        for segment in path {
            current = current.get_segment(segment)?;
        }
        Some(current)
    }

    /// Render for "partial replacement" inside a larger string: scalars use
    /// their native textual form, composites are JSON-encoded. Decided in
    /// DESIGN.md (spec.md's Open Question #1).
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
            Value::Placeholder(raw) => raw.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(&self.clone().into_json()).unwrap_or_default()
            }
        }
    }

    /// Convert to `serde_json::Value`, losing map key order and turning any
    /// stray `Placeholder` into its raw source text.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Placeholder(raw) => serde_json::Value::String(raw),
            Value::List(l) => serde_json::Value::Array(l.into_iter().map(Value::into_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.clone().into_json()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(Value::Int(1).is_truthy());
    }

    #[test]
    fn path_navigation_short_circuits_on_miss() {
        let v: Value = serde_json::json!({"a": {"b": [1, 2, 3]}}).into();
        let path = vec![
            PathSegment::Key("a".into()),
            PathSegment::Key("b".into()),
            PathSegment::Index(1),
        ];
        assert_eq!(v.get_path(&path), Some(&Value::Int(2)));

        let missing = vec![PathSegment::Key("nope".into())];
        assert_eq!(v.get_path(&missing), None);
    }

    #[test]
    fn stringify_scalars_vs_composites() {
        assert_eq!(Value::Int(42).stringify(), "42");
        assert_eq!(Value::Bool(true).stringify(), "true");
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.stringify(), "[1,2]");
    }

    #[test]
    fn json_round_trip_preserves_scalars() {
        let v: Value = serde_json::json!({"x": 1, "y": "z", "list": [true, null]}).into();
        let json = v.to_json();
        let back = Value::from(json);
        assert_eq!(v, back);
    }
}
