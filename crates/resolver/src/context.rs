//! Runtime resolution context — spec.md §4.2's "runtime context comprising:
//! `input`, every completed node's `NodeResult`... and `request_data`".

use indexmap::IndexMap;
use value::Value;

/// Everything a `{{ … }}` expression can read from at resolution time.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// The execution's initial input.
    pub input: Value,
    /// Completed node results, keyed by NodeId. Each entry is whatever the
    /// executor returned, normalized into a `Value` (so `status`/`result`/
    /// `data` keys live inside the map like any other field).
    pub node_results: IndexMap<String, Value>,
    /// `{{key:NAME}}` lookups — values explicitly stashed under a short name
    /// during execution (e.g. by a `set` node).
    pub resolved_keys: IndexMap<String, Value>,
    /// Present only in the agent's sub-DAG execution (spec.md §4.7); `Null`
    /// elsewhere.
    pub request_data: Value,
}

impl ResolutionContext {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            node_results: IndexMap::new(),
            resolved_keys: IndexMap::new(),
            request_data: Value::Null,
        }
    }

    pub fn record_result(&mut self, node_id: impl Into<String>, result: Value) {
        self.node_results.insert(node_id.into(), result);
    }
}
