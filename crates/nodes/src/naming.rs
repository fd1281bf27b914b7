//! Node-type name derivation — spec.md §4.3: "class-name-to-type-string
//! derivation, e.g. `MyFooNode` → `my_foo`". Rust has no runtime module
//! scanning, so this is invoked explicitly by `register_as::<T>()` off
//! `std::any::type_name` instead of Python's filesystem discovery.

/// `MyFooNode` -> `my_foo`, `HTTPRequestNode` -> `http_request`,
/// `If` -> `if`. Strips a trailing `Node` and converts CamelCase to
/// snake_case, treating runs of uppercase letters as one unit.
pub fn derive_node_type(type_name: &str) -> String {
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    let short = short.strip_suffix("Node").unwrap_or(short);

    let mut out = String::new();
    let chars: Vec<char> = short.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_is_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_is_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && (prev_is_lower || (next_is_lower && chars[i - 1].is_uppercase())) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_node_suffix_and_converts_case() {
        assert_eq!(derive_node_type("MyFooNode"), "my_foo");
    }

    #[test]
    fn keeps_acronym_runs_together() {
        assert_eq!(derive_node_type("HTTPRequestNode"), "http_request");
    }

    #[test]
    fn short_name_lowercases_cleanly() {
        assert_eq!(derive_node_type("IfNode"), "if");
    }

    #[test]
    fn strips_module_path() {
        assert_eq!(derive_node_type("nodes::builtin::SetNode"), "set");
    }
}
