//! Built-in filters — spec.md §4.2's list, applied left to right in a
//! `filtered` expression. "Implementations apply to the semantically
//! appropriate Value cases; applying to an unsuitable type yields `null` or
//! the value's string form (never an exception)."

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;
use value::Value;

pub type FilterFn = fn(&Value, &[Value]) -> Value;

pub static FILTERS: Lazy<HashMap<&'static str, FilterFn>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, FilterFn> = HashMap::new();
    m.insert("length", length);
    m.insert("len", length);
    m.insert("upper", upper);
    m.insert("lower", lower);
    m.insert("capitalize", capitalize);
    m.insert("strip", strip);
    m.insert("default", default);
    m.insert("truncate", truncate);
    m.insert("join", join);
    m.insert("first", first);
    m.insert("last", last);
    m.insert("sort", sort);
    m.insert("reverse", reverse);
    m.insert("unique", unique);
    m.insert("sum", sum);
    m.insert("max", max);
    m.insert("min", min);
    m.insert("round", round);
    m.insert("abs", abs);
    m.insert("int", int);
    m.insert("float", float);
    m.insert("str", str_filter);
    m.insert("bool", bool_filter);
    m.insert("json", json_filter);
    m
});

fn length(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::String(s) => Value::Int(s.chars().count() as i64),
        Value::List(l) => Value::Int(l.len() as i64),
        Value::Map(m) => Value::Int(m.len() as i64),
        _ => Value::Null,
    }
}

fn upper(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::String(s) => Value::String(s.to_uppercase()),
        _ => Value::Null,
    }
}

fn lower(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::String(s) => Value::String(s.to_lowercase()),
        _ => Value::Null,
    }
}

fn capitalize(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::String(s) => {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => {
                    Value::String(first.to_uppercase().collect::<String>() + chars.as_str())
                }
                None => Value::String(String::new()),
            }
        }
        _ => Value::Null,
    }
}

fn strip(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::String(s) => Value::String(s.trim().to_string()),
        _ => Value::Null,
    }
}

fn default(v: &Value, args: &[Value]) -> Value {
    if v.is_null() {
        args.first().cloned().unwrap_or(Value::Null)
    } else {
        v.clone()
    }
}

fn truncate(v: &Value, args: &[Value]) -> Value {
    match v {
        Value::String(s) => {
            let n = args.first().and_then(Value::as_i64).unwrap_or(s.len() as i64).max(0) as usize;
            if s.chars().count() <= n {
                Value::String(s.clone())
            } else {
                Value::String(s.chars().take(n).collect::<String>() + "...")
            }
        }
        _ => Value::Null,
    }
}

fn join(v: &Value, args: &[Value]) -> Value {
    match v {
        Value::List(items) => {
            let sep = args.first().and_then(Value::as_str).unwrap_or(",").to_string();
            Value::String(
                items
                    .iter()
                    .map(Value::stringify)
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        _ => Value::Null,
    }
}

fn first(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .next()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn last(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => items.last().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .last()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.stringify().cmp(&b.stringify()),
    }
}

fn sort(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => {
            let mut sorted = items.clone();
            sorted.sort_by(compare_values);
            Value::List(sorted)
        }
        _ => Value::Null,
    }
}

fn reverse(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => {
            let mut reversed = items.clone();
            reversed.reverse();
            Value::List(reversed)
        }
        Value::String(s) => Value::String(s.chars().rev().collect()),
        _ => Value::Null,
    }
}

fn unique(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => {
            let mut seen = Vec::new();
            let mut out = Vec::new();
            for item in items {
                let key = item.stringify();
                if !seen.contains(&key) {
                    seen.push(key);
                    out.push(item.clone());
                }
            }
            Value::List(out)
        }
        _ => Value::Null,
    }
}

fn sum(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => {
            let mut total = 0.0;
            let mut all_int = true;
            for item in items {
                match item.as_f64() {
                    Some(f) => {
                        total += f;
                        if !matches!(item, Value::Int(_)) {
                            all_int = false;
                        }
                    }
                    None => return Value::Null,
                }
            }
            if all_int {
                Value::Int(total as i64)
            } else {
                Value::Float(total)
            }
        }
        _ => Value::Null,
    }
}

fn max(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => items
            .iter()
            .max_by(|a, b| compare_values(a, b))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn min(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::List(items) => items
            .iter()
            .min_by(|a, b| compare_values(a, b))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn round(v: &Value, args: &[Value]) -> Value {
    match v.as_f64() {
        Some(f) => {
            let digits = args.first().and_then(Value::as_i64).unwrap_or(0).max(0) as i32;
            let factor = 10f64.powi(digits);
            let rounded = (f * factor).round() / factor;
            if digits == 0 {
                Value::Int(rounded as i64)
            } else {
                Value::Float(rounded)
            }
        }
        None => Value::Null,
    }
}

fn abs(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::Int(i) => Value::Int(i.abs()),
        Value::Float(f) => Value::Float(f.abs()),
        _ => Value::Null,
    }
}

fn int(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::Int(i) => Value::Int(*i),
        Value::Float(f) => Value::Int(*f as i64),
        Value::Bool(b) => Value::Int(if *b { 1 } else { 0 }),
        Value::String(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn float(v: &Value, _args: &[Value]) -> Value {
    match v {
        Value::Int(i) => Value::Float(*i as f64),
        Value::Float(f) => Value::Float(*f),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn str_filter(v: &Value, _args: &[Value]) -> Value {
    Value::String(v.stringify())
}

fn bool_filter(v: &Value, _args: &[Value]) -> Value {
    Value::Bool(v.is_truthy())
}

fn json_filter(v: &Value, _args: &[Value]) -> Value {
    Value::String(serde_json::to_string(&v.to_json()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_handles_each_collection() {
        assert_eq!(length(&Value::String("abc".into()), &[]), Value::Int(3));
        assert_eq!(
            length(&Value::List(vec![Value::Int(1), Value::Int(2)]), &[]),
            Value::Int(2)
        );
        assert_eq!(length(&Value::Int(1), &[]), Value::Null);
    }

    #[test]
    fn default_only_applies_to_null() {
        assert_eq!(default(&Value::Null, &[Value::Int(7)]), Value::Int(7));
        assert_eq!(default(&Value::Int(1), &[Value::Int(7)]), Value::Int(1));
    }

    #[test]
    fn sort_and_unique_preserve_semantics() {
        let list = Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(
            sort(&list, &[]),
            Value::List(vec![Value::Int(1), Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            unique(&list, &[]),
            Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn round_respects_digit_argument() {
        assert_eq!(round(&Value::Float(3.14159), &[Value::Int(2)]), Value::Float(3.14));
        assert_eq!(round(&Value::Float(3.6), &[]), Value::Int(4));
    }
}
