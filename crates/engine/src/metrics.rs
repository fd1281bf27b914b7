//! Run metrics — spec.md §4.6 / §3.5: "counters (per-node durations, cache
//! hits/misses, retry counts, circuit-breaker trips, placeholders resolved,
//! checkpoints saved)."

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use value::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub node_execution_times: HashMap<String, Duration>,
    pub resolution_cache_hits: u64,
    pub resolution_cache_misses: u64,
    pub total_placeholders_resolved: u64,
    pub retry_counts: HashMap<String, u32>,
    pub circuit_breaker_trips: HashMap<String, u32>,
    pub checkpoint_saves: u32,
}

impl Metrics {
    pub fn record_duration(&mut self, node_id: &str, duration: Duration) {
        self.node_execution_times.insert(node_id.to_string(), duration);
    }

    pub fn record_retry(&mut self, node_id: &str) {
        *self.retry_counts.entry(node_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_circuit_trip(&mut self, node_type: &str) {
        *self.circuit_breaker_trips.entry(node_type.to_string()).or_insert(0) += 1;
    }

    /// Pull the resolver's running cache-hit/miss/resolved counters into this
    /// run's metrics; called once per node after placeholder resolution.
    pub fn absorb_resolver_counters(&mut self, cache_hits: u64, cache_misses: u64, total_resolved: u64) {
        self.resolution_cache_hits = cache_hits;
        self.resolution_cache_misses = cache_misses;
        self.total_placeholders_resolved = total_resolved;
    }

    /// Flat map export — spec.md §4.6: "Recorded in memory per run and
    /// exported as a flat map."
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        map.insert(
            "node_execution_times".to_string(),
            Value::Map(
                self.node_execution_times
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Float(v.as_secs_f64())))
                    .collect(),
            ),
        );
        map.insert("resolution_cache_hits".to_string(), Value::Int(self.resolution_cache_hits as i64));
        map.insert("resolution_cache_misses".to_string(), Value::Int(self.resolution_cache_misses as i64));
        map.insert(
            "total_placeholders_resolved".to_string(),
            Value::Int(self.total_placeholders_resolved as i64),
        );
        map.insert(
            "retry_counts".to_string(),
            Value::Map(self.retry_counts.iter().map(|(k, v)| (k.clone(), Value::Int(*v as i64))).collect()),
        );
        map.insert(
            "circuit_breaker_trips".to_string(),
            Value::Map(self.circuit_breaker_trips.iter().map(|(k, v)| (k.clone(), Value::Int(*v as i64))).collect()),
        );
        map.insert("checkpoint_saves".to_string(), Value::Int(self.checkpoint_saves as i64));
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_counts_accumulate_per_node() {
        let mut m = Metrics::default();
        m.record_retry("a");
        m.record_retry("a");
        m.record_retry("b");
        assert_eq!(m.retry_counts["a"], 2);
        assert_eq!(m.retry_counts["b"], 1);
    }

    #[test]
    fn to_value_flattens_every_counter() {
        let mut m = Metrics::default();
        m.checkpoint_saves = 2;
        let v = m.to_value();
        assert_eq!(v.get_segment(&value::PathSegment::Key("checkpoint_saves".into())), Some(&Value::Int(2)));
    }
}
