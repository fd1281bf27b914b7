//! spec.md §4.7: "**SQL parameter convention**: for nodes whose type is
//! `neon` with `operation = execute_query` under a `POST`, if
//! `params.parameters` is not already a list and the node defines
//! `parameters_order` (a comma-separated string of keys), assemble the SQL
//! parameter list by reading each named key from the request body in order.
//! Missing keys empty the list and log an error. This is a pragmatic
//! conventions-layer the agent applies only to this combination."

use indexmap::IndexMap;
use value::Value;

pub fn apply_sql_parameter_convention(
    node_type: &str,
    params: &IndexMap<String, Value>,
    request_method: &str,
    request_data: &Value,
) -> IndexMap<String, Value> {
    let mut params = params.clone();

    if node_type != "neon" || !request_method.eq_ignore_ascii_case("POST") {
        return params;
    }
    if params.get("operation").and_then(Value::as_str) != Some("execute_query") {
        return params;
    }
    if matches!(params.get("parameters"), Some(Value::List(_))) {
        return params;
    }
    let Some(order) = params.get("parameters_order").and_then(Value::as_str).map(str::to_string) else {
        return params;
    };

    let keys: Vec<&str> = order.split(',').map(str::trim).filter(|k| !k.is_empty()).collect();
    let mut assembled = Vec::with_capacity(keys.len());
    let mut missing = false;
    for key in &keys {
        match request_data.as_map().and_then(|m| m.get(*key)) {
            Some(v) => assembled.push(v.clone()),
            None => {
                tracing::error!("SQL parameter convention: request body missing key '{key}' named by parameters_order");
                missing = true;
                break;
            }
        }
    }
    params.insert("parameters".to_string(), Value::List(if missing { Vec::new() } else { assembled }));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(pairs: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    fn params(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        m
    }

    #[test]
    fn assembles_parameters_in_declared_order() {
        let p = params(&[
            ("operation", Value::String("execute_query".to_string())),
            ("parameters_order", Value::String("id, name".to_string())),
        ]);
        let body = body(&[("name", Value::String("bob".to_string())), ("id", Value::Int(7))]);
        let out = apply_sql_parameter_convention("neon", &p, "POST", &body);
        assert_eq!(out["parameters"], Value::List(vec![Value::Int(7), Value::String("bob".to_string())]));
    }

    #[test]
    fn missing_key_empties_the_list() {
        let p = params(&[
            ("operation", Value::String("execute_query".to_string())),
            ("parameters_order", Value::String("id".to_string())),
        ]);
        let out = apply_sql_parameter_convention("neon", &p, "POST", &Value::map());
        assert_eq!(out["parameters"], Value::List(Vec::new()));
    }

    #[test]
    fn leaves_existing_list_parameters_untouched() {
        let p = params(&[
            ("operation", Value::String("execute_query".to_string())),
            ("parameters_order", Value::String("id".to_string())),
            ("parameters", Value::List(vec![Value::Int(1)])),
        ]);
        let out = apply_sql_parameter_convention("neon", &p, "POST", &Value::map());
        assert_eq!(out["parameters"], Value::List(vec![Value::Int(1)]));
    }

    #[test]
    fn only_applies_to_neon_execute_query_under_post() {
        let p = params(&[
            ("operation", Value::String("execute_query".to_string())),
            ("parameters_order", Value::String("id".to_string())),
        ]);
        let unchanged = apply_sql_parameter_convention("neon", &p, "GET", &Value::map());
        assert!(unchanged.get("parameters").is_none());
        let unchanged = apply_sql_parameter_convention("other", &p, "POST", &Value::map());
        assert!(unchanged.get("parameters").is_none());
    }
}
