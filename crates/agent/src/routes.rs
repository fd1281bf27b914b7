//! Dynamic route discovery — spec.md §4.7: "Scans the workflow for nodes of
//! type `aci` with parameter `operation = add_route`." Each such node
//! defines a Flask-style path (`/api/content/<string:id>`); axum builds its
//! router once at startup, so incoming requests are matched against this
//! table by hand rather than by re-registering routes per workflow load.

use indexmap::IndexMap;
use parser::Workflow;
use value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int,
    Float,
    Path,
}

#[derive(Debug, Clone)]
pub enum PathToken {
    Literal(String),
    Param { name: String, kind: ParamKind },
}

#[derive(Debug, Clone)]
pub struct RouteDef {
    pub node_id: String,
    pub route_path: String,
    pub tokens: Vec<PathToken>,
    pub methods: Vec<String>,
    pub handler: String,
    pub auth_required: bool,
    pub rate_limit: Option<Value>,
    pub description: String,
}

impl RouteDef {
    /// Match an incoming request path against this route's tokens, returning
    /// extracted path parameters on success.
    pub fn matches(&self, path: &str) -> Option<IndexMap<String, Value>> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        let mut params = IndexMap::new();
        let mut seg_iter = segments.iter();

        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                PathToken::Literal(lit) => {
                    if seg_iter.next() != Some(&lit.as_str()) {
                        return None;
                    }
                }
                PathToken::Param { name, kind: ParamKind::Path } => {
                    // A `<path:...>` converter greedily consumes every
                    // remaining segment; it must be the final token.
                    let rest: Vec<&str> = seg_iter.by_ref().copied().collect();
                    if rest.is_empty() && i != self.tokens.len() - 1 {
                        return None;
                    }
                    params.insert(name.clone(), Value::String(rest.join("/")));
                }
                PathToken::Param { name, kind } => {
                    let raw = seg_iter.next()?;
                    params.insert(name.clone(), coerce_param(raw, kind)?);
                }
            }
        }
        if seg_iter.next().is_some() {
            return None;
        }
        Some(params)
    }
}

fn coerce_param(raw: &str, kind: &ParamKind) -> Option<Value> {
    match kind {
        ParamKind::String | ParamKind::Path => Some(Value::String(raw.to_string())),
        ParamKind::Int => raw.parse::<i64>().ok().map(Value::Int),
        ParamKind::Float => raw.parse::<f64>().ok().map(Value::Float),
    }
}

/// Parse a Flask-style path (`/api/content/<string:id>`) into match tokens.
pub fn parse_route_path(path: &str) -> Vec<PathToken> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                let (kind, name) = match inner.split_once(':') {
                    Some(("int", name)) => (ParamKind::Int, name),
                    Some(("float", name)) => (ParamKind::Float, name),
                    Some(("path", name)) => (ParamKind::Path, name),
                    Some(("string", name)) => (ParamKind::String, name),
                    Some((_, name)) => (ParamKind::String, name),
                    None => (ParamKind::String, inner),
                };
                PathToken::Param { name: name.to_string(), kind }
            } else {
                PathToken::Literal(segment.to_string())
            }
        })
        .collect()
}

fn normalize_methods(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::List(items)) => items.iter().filter_map(Value::as_str).map(|s| s.to_uppercase()).collect(),
        Some(Value::String(s)) => vec![s.to_uppercase()],
        _ => vec!["GET".to_string()],
    }
}

/// spec.md §4.7: "Scans the workflow for nodes of type `aci` with parameter
/// `operation = add_route`."
pub fn discover_routes(workflow: &Workflow) -> Vec<RouteDef> {
    let mut routes = Vec::new();
    for node in workflow.nodes.values() {
        if node.node_type != "aci" {
            continue;
        }
        let Some(operation) = node.params.get("operation").and_then(Value::as_str) else {
            continue;
        };
        if operation != "add_route" {
            continue;
        }
        let Some(route_path) = node.params.get("route_path").and_then(Value::as_str) else {
            tracing::warn!("aci node '{}' declares add_route without a route_path; skipping", node.id);
            continue;
        };
        let handler = node.params.get("handler").and_then(Value::as_str).unwrap_or(&node.id).to_string();
        let auth_required = node.params.get("auth_required").and_then(Value::as_bool).unwrap_or(false);
        let rate_limit = node.params.get("rate_limit").cloned();
        let description = node.params.get("description").and_then(Value::as_str).unwrap_or_default().to_string();

        routes.push(RouteDef {
            node_id: node.id.clone(),
            route_path: route_path.to_string(),
            tokens: parse_route_path(route_path),
            methods: normalize_methods(node.params.get("methods")),
            handler,
            auth_required,
            rate_limit,
            description,
        });
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flask_string_and_int_converters_are_recognized() {
        let tokens = parse_route_path("/api/content/<string:id>/rev/<int:n>");
        assert!(matches!(&tokens[2], PathToken::Param { kind: ParamKind::String, name } if name == "id"));
        assert!(matches!(&tokens[4], PathToken::Param { kind: ParamKind::Int, name } if name == "n"));
    }

    #[test]
    fn route_matches_and_extracts_typed_params() {
        let route = RouteDef {
            node_id: "n".into(),
            route_path: "/api/content/<string:id>".into(),
            tokens: parse_route_path("/api/content/<string:id>"),
            methods: vec!["GET".into()],
            handler: "h".into(),
            auth_required: false,
            rate_limit: None,
            description: String::new(),
        };
        let params = route.matches("/api/content/abc123").unwrap();
        assert_eq!(params["id"], Value::String("abc123".to_string()));
        assert!(route.matches("/api/content/abc/extra").is_none());
        assert!(route.matches("/other").is_none());
    }

    #[test]
    fn discover_routes_skips_non_add_route_aci_nodes() {
        let mut wf = Workflow::empty("wf", "start");
        let mut other = parser::NodeDef::new("start", "aci");
        other.params.insert("operation".to_string(), Value::String("remove_route".to_string()));
        wf.nodes.insert("start".to_string(), other);
        assert!(discover_routes(&wf).is_empty());
    }

    #[test]
    fn bare_angle_brackets_default_to_string_converter() {
        let tokens = parse_route_path("/items/<id>");
        assert!(matches!(&tokens[1], PathToken::Param { kind: ParamKind::String, name } if name == "id"));
    }
}
