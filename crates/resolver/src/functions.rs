//! Built-in functions — spec.md §4.2: `len`, `max`, `min`, `sum`, `abs`,
//! `round`, `range(start,stop[,step])`, `enumerate`.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use value::Value;

pub type FunctionFn = fn(&[Value]) -> Value;

pub static FUNCTIONS: Lazy<HashMap<&'static str, FunctionFn>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, FunctionFn> = HashMap::new();
    m.insert("len", fn_len);
    m.insert("max", fn_max);
    m.insert("min", fn_min);
    m.insert("sum", fn_sum);
    m.insert("abs", fn_abs);
    m.insert("round", fn_round);
    m.insert("range", fn_range);
    m.insert("enumerate", fn_enumerate);
    m
});

/// A function call takes a single list argument (the enclosing path's
/// value), or is called with explicit literal args, depending on grammar
/// position; callers flatten accordingly before dispatch.
fn as_list(args: &[Value]) -> Vec<Value> {
    if args.len() == 1 {
        if let Value::List(items) = &args[0] {
            return items.clone();
        }
    }
    args.to_vec()
}

fn fn_len(args: &[Value]) -> Value {
    Value::Int(as_list(args).len() as i64)
}

fn fn_max(args: &[Value]) -> Value {
    as_list(args)
        .into_iter()
        .max_by(|a, b| {
            a.as_f64()
                .unwrap_or(f64::MIN)
                .partial_cmp(&b.as_f64().unwrap_or(f64::MIN))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(Value::Null)
}

fn fn_min(args: &[Value]) -> Value {
    as_list(args)
        .into_iter()
        .min_by(|a, b| {
            a.as_f64()
                .unwrap_or(f64::MAX)
                .partial_cmp(&b.as_f64().unwrap_or(f64::MAX))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(Value::Null)
}

fn fn_sum(args: &[Value]) -> Value {
    let items = as_list(args);
    let mut total = 0.0;
    let mut all_int = true;
    for item in &items {
        if let Some(f) = item.as_f64() {
            total += f;
            if !matches!(item, Value::Int(_)) {
                all_int = false;
            }
        }
    }
    if all_int {
        Value::Int(total as i64)
    } else {
        Value::Float(total)
    }
}

fn fn_abs(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Int(i)) => Value::Int(i.abs()),
        Some(Value::Float(f)) => Value::Float(f.abs()),
        _ => Value::Null,
    }
}

fn fn_round(args: &[Value]) -> Value {
    let Some(f) = args.first().and_then(Value::as_f64) else {
        return Value::Null;
    };
    let digits = args.get(1).and_then(Value::as_i64).unwrap_or(0).max(0) as i32;
    let factor = 10f64.powi(digits);
    let rounded = (f * factor).round() / factor;
    if digits == 0 {
        Value::Int(rounded as i64)
    } else {
        Value::Float(rounded)
    }
}

fn fn_range(args: &[Value]) -> Value {
    let start = args.first().and_then(Value::as_i64).unwrap_or(0);
    let Some(stop) = args.get(1).and_then(Value::as_i64) else {
        return Value::List(Vec::new());
    };
    let step = args.get(2).and_then(Value::as_i64).unwrap_or(1);
    if step == 0 {
        return Value::List(Vec::new());
    }
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            out.push(Value::Int(i));
            i += step;
        }
    } else {
        while i > stop {
            out.push(Value::Int(i));
            i += step;
        }
    }
    Value::List(out)
}

fn fn_enumerate(args: &[Value]) -> Value {
    let items = as_list(args);
    Value::List(
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| Value::List(vec![Value::Int(i as i64), v]))
            .collect(),
    )
}
