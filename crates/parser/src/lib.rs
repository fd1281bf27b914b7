//! Actfile parsing — spec.md §4.1.
//!
//! Turns a sectioned `.actfile` text document into a [`Workflow`]. Grounded
//! on `actfile_parser.py`'s `ActfileParser`: sections are collected with a
//! single index-driven pass over the lines so that triple-quote and
//! multiline-JSON blocks can swallow lines (including ones that would
//! otherwise look like a new `[section]` header) without a second pass.

pub mod error;
pub mod model;
pub mod scalar;
pub mod statics;

pub use error::ParseError;
pub use model::{NodeDef, Workflow};

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use value::Value;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s*(?:[#;].*)?$").unwrap());

/// Parse an Actfile from disk. Relative `path = ` node file-loads resolve
/// against the Actfile's own directory.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Workflow, ParseError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_str(&content, &base_dir)
}

/// Parse an Actfile already loaded into memory. `base_dir` anchors relative
/// `path = ` file-loads inside `type = py`/`type = python` nodes.
pub fn parse_str(content: &str, base_dir: &Path) -> Result<Workflow, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let sections = split_sections(&lines)?;

    let mut workflow = Workflow::empty("", "");

    for section in &sections {
        match section.name.as_str() {
            "workflow" => apply_workflow_section(&mut workflow, section)?,
            "parameters" => {
                workflow.parameters = collect_scalar_map(section)?;
            }
            "env" => {
                workflow.env = collect_env_map(section);
            }
            "settings" => workflow.settings = collect_scalar_map(section)?,
            "configuration" => workflow.configuration = collect_scalar_map(section)?,
            "deployment" => workflow.deployment = collect_scalar_map(section)?,
            "edges" => workflow.edges = collect_edge_map(section),
            "dependencies" => workflow.dependencies = collect_dependency_map(section),
            name if name.starts_with("node:") => {
                let id = name["node:".len()..].trim().to_string();
                let node = build_node(&id, section, base_dir)?;
                workflow.nodes.insert(id, node);
            }
            other => {
                tracing::warn!("ignoring unknown Actfile section '[{other}]'");
            }
        }
    }

    substitute_static_sections(&mut workflow);
    validate(&workflow)?;
    Ok(workflow)
}

/// A `[name]` section and its raw body entries (key, raw-value-text or an
/// already-extracted block), produced by the single sectioning pass.
struct Section {
    name: String,
    entries: Vec<Entry>,
}

struct Entry {
    key: String,
    /// For ordinary lines this is the right-hand-side text, still subject to
    /// `scalar::parse_scalar`. For triple-quote/JSON blocks it's pre-resolved.
    resolved: Resolved,
}

enum Resolved {
    Raw(String),
    Block(String),
    Json(Value),
}

fn split_sections(lines: &[&str]) -> Result<Vec<Section>, ParseError> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            i += 1;
            continue;
        }

        if trimmed.starts_with('[') {
            if let Some(caps) = HEADER_RE.captures(trimmed) {
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                current = Some(Section {
                    name: caps[1].trim().to_string(),
                    entries: Vec::new(),
                });
                i += 1;
                continue;
            } else if !trimmed.contains('=') {
                return Err(ParseError::MalformedHeader(trimmed.to_string()));
            }
        }

        let Some(section) = current.as_mut() else {
            i += 1;
            continue;
        };

        let Some(eq_idx) = line.find('=') else {
            tracing::warn!("ignoring unparseable line in [{}]: '{}'", section.name, line);
            i += 1;
            continue;
        };

        let key = line[..eq_idx].trim().to_string();
        let value_part = line[eq_idx + 1..].trim();

        if value_part.starts_with("\"\"\"") {
            let (body, next_i) =
                consume_triple_quote_block(lines, i, value_part, &section.name, &key)?;
            section.entries.push(Entry {
                key,
                resolved: Resolved::Block(body),
            });
            i = next_i;
            continue;
        }

        if starts_multiline_json(value_part) {
            let (value, next_i) = consume_multiline_json(lines, i, value_part);
            section.entries.push(Entry {
                key,
                resolved: Resolved::Json(value),
            });
            i = next_i;
            continue;
        }

        section.entries.push(Entry {
            key,
            resolved: Resolved::Raw(value_part.to_string()),
        });
        i += 1;
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    Ok(sections)
}

fn starts_multiline_json(value_part: &str) -> bool {
    (value_part.starts_with('[') || value_part.starts_with('{')) && bracket_depth(value_part) != 0
}

fn bracket_depth(text: &str) -> i64 {
    let mut depth = 0i64;
    for c in text.chars() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// `value_part` is the text after `key = `, already known to start with `"""`.
fn consume_triple_quote_block(
    lines: &[&str],
    start_i: usize,
    value_part: &str,
    section: &str,
    key: &str,
) -> Result<(String, usize), ParseError> {
    let after_open = &value_part[3..];

    // Single-line block: `key = """text"""`.
    if let Some(close_idx) = after_open.find("\"\"\"") {
        return Ok((after_open[..close_idx].to_string(), start_i + 1));
    }

    let mut body_lines: Vec<String> = Vec::new();
    if !after_open.is_empty() {
        body_lines.push(after_open.to_string());
    }

    let mut i = start_i + 1;
    while i < lines.len() {
        let line = lines[i];
        if let Some(close_idx) = line.find("\"\"\"") {
            let pre = &line[..close_idx];
            if !pre.is_empty() {
                body_lines.push(pre.to_string());
            }
            return Ok((body_lines.join("\n"), i + 1));
        }
        body_lines.push(line.to_string());
        i += 1;
    }

    Err(ParseError::UnterminatedBlock {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn consume_multiline_json(lines: &[&str], start_i: usize, value_part: &str) -> (Value, usize) {
    let mut buffer = value_part.to_string();
    let mut depth = bracket_depth(value_part);
    let mut i = start_i + 1;

    while depth != 0 && i < lines.len() {
        buffer.push('\n');
        buffer.push_str(lines[i]);
        depth += bracket_depth(lines[i]);
        i += 1;
    }

    let value = serde_json::from_str::<serde_json::Value>(&buffer)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(buffer));
    (value, i)
}

fn apply_workflow_section(workflow: &mut Workflow, section: &Section) -> Result<(), ParseError> {
    for entry in &section.entries {
        let text = entry_as_text(entry);
        match entry.key.as_str() {
            "name" => workflow.name = text,
            "description" => workflow.description = text,
            "start_node" => workflow.start_node = text,
            other => {
                tracing::warn!("ignoring unknown [workflow] key '{other}'");
            }
        }
    }
    Ok(())
}

fn entry_as_text(entry: &Entry) -> String {
    match &entry.resolved {
        Resolved::Raw(raw) => scalar::parse_scalar(raw).stringify(),
        Resolved::Block(body) => body.clone(),
        Resolved::Json(v) => v.stringify(),
    }
}

fn entry_value(entry: &Entry) -> Value {
    match &entry.resolved {
        Resolved::Raw(raw) => scalar::parse_scalar(raw),
        Resolved::Block(body) => Value::String(body.clone()),
        Resolved::Json(v) => v.clone(),
    }
}

fn collect_scalar_map(
    section: &Section,
) -> Result<indexmap::IndexMap<String, Value>, ParseError> {
    let mut map = indexmap::IndexMap::new();
    for entry in &section.entries {
        map.insert(entry.key.clone(), entry_value(entry));
    }
    Ok(map)
}

fn collect_env_map(section: &Section) -> indexmap::IndexMap<String, String> {
    static SOLE_ENV_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}$").unwrap());

    let mut map = indexmap::IndexMap::new();
    for entry in &section.entries {
        let raw = match &entry.resolved {
            Resolved::Raw(raw) => raw.clone(),
            Resolved::Block(body) => body.clone(),
            Resolved::Json(v) => v.stringify(),
        };
        let resolved = if let Some(caps) = SOLE_ENV_RE.captures(raw.trim()) {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!("[env] variable '{var_name}' is not set; using empty string");
                String::new()
            })
        } else {
            raw
        };
        map.insert(entry.key.clone(), resolved);
    }
    map
}

fn collect_edge_map(section: &Section) -> indexmap::IndexMap<String, Vec<String>> {
    let mut map: indexmap::IndexMap<String, Vec<String>> = indexmap::IndexMap::new();
    for entry in &section.entries {
        let raw = match &entry.resolved {
            Resolved::Raw(raw) => raw.clone(),
            Resolved::Block(body) => body.clone(),
            Resolved::Json(v) => v.stringify(),
        };
        let targets: Vec<String> = raw
            .split(',')
            .map(strip_trailing_comment)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        map.entry(entry.key.clone()).or_default().extend(targets);
    }
    map
}

fn collect_dependency_map(section: &Section) -> indexmap::IndexMap<String, Vec<String>> {
    let mut map: indexmap::IndexMap<String, Vec<String>> = indexmap::IndexMap::new();
    for entry in &section.entries {
        let raw = match &entry.resolved {
            Resolved::Raw(raw) => raw.clone(),
            Resolved::Block(body) => body.clone(),
            Resolved::Json(v) => v.stringify(),
        };
        let targets: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        map.entry(entry.key.clone()).or_default().extend(targets);
    }
    map
}

fn strip_trailing_comment(s: &str) -> &str {
    let mut end = s.len();
    for (idx, c) in s.char_indices() {
        if c == '#' || c == ';' {
            end = idx;
            break;
        }
    }
    &s[..end]
}

fn build_node(id: &str, section: &Section, base_dir: &Path) -> Result<NodeDef, ParseError> {
    let mut node = NodeDef::new(id, "");

    for entry in &section.entries {
        if entry.key == "type" {
            node.node_type = entry_as_text(entry);
        } else {
            node.params.insert(entry.key.clone(), entry_value(entry));
        }
    }

    if node.node_type.trim().is_empty() {
        return Err(ParseError::MissingNodeType(id.to_string()));
    }

    if matches!(node.node_type.as_str(), "py" | "python") {
        if let Some(Value::String(rel_path)) = node.params.get("path").cloned() {
            let full_path: PathBuf = base_dir.join(&rel_path);
            let code = std::fs::read_to_string(&full_path).map_err(|source| ParseError::FileLoad {
                node_id: id.to_string(),
                path: full_path.display().to_string(),
                source,
            })?;
            node.params.insert("code".to_string(), Value::String(code));
        }
    }

    Ok(node)
}

fn substitute_static_sections(workflow: &mut Workflow) {
    let parameters = workflow.parameters.clone();

    let mut description = Value::String(workflow.description.clone());
    statics::substitute_value(&mut description, &parameters);
    if let Value::String(s) = description {
        workflow.description = s;
    }

    for map in [
        &mut workflow.settings,
        &mut workflow.configuration,
        &mut workflow.deployment,
    ] {
        for (_, v) in map.iter_mut() {
            statics::substitute_value(v, &parameters);
        }
    }

    for node in workflow.nodes.values_mut() {
        for (_, v) in node.params.iter_mut() {
            statics::substitute_value(v, &parameters);
        }
    }
}

fn validate(workflow: &Workflow) -> Result<(), ParseError> {
    if workflow.start_node.trim().is_empty() {
        return Err(ParseError::MissingStartNode);
    }
    if !workflow.nodes.contains_key(&workflow.start_node) {
        return Err(ParseError::UnknownStartNode(workflow.start_node.clone()));
    }

    for (source, targets) in &workflow.edges {
        if !workflow.nodes.contains_key(source) {
            return Err(ParseError::DanglingEdge {
                node_id: source.clone(),
                side: "source",
            });
        }
        for target in targets {
            if !workflow.nodes.contains_key(target) {
                return Err(ParseError::DanglingEdge {
                    node_id: target.clone(),
                    side: "target",
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base_dir() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn parses_minimal_workflow() {
        let src = r#"
[workflow]
name = demo
description = a small demo
start_node = a

[node:a]
type = noop

[node:b]
type = noop

[edges]
a = b
"#;
        let wf = parse_str(src, &base_dir()).unwrap();
        assert_eq!(wf.name, "demo");
        assert_eq!(wf.start_node, "a");
        assert_eq!(wf.nodes.len(), 2);
        assert_eq!(wf.successors("a"), &["b".to_string()]);
    }

    #[test]
    fn missing_start_node_fails() {
        let src = "[workflow]\nname = demo\n";
        let err = parse_str(src, &base_dir()).unwrap_err();
        assert!(matches!(err, ParseError::MissingStartNode));
    }

    #[test]
    fn unknown_start_node_fails() {
        let src = "[workflow]\nstart_node = ghost\n[node:a]\ntype = noop\n";
        let err = parse_str(src, &base_dir()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownStartNode(ref id) if id == "ghost"));
    }

    #[test]
    fn dangling_edge_target_fails() {
        let src = r#"
[workflow]
start_node = a
[node:a]
type = noop
[edges]
a = ghost
"#;
        let err = parse_str(src, &base_dir()).unwrap_err();
        assert!(matches!(err, ParseError::DanglingEdge { side: "target", .. }));
    }

    #[test]
    fn node_missing_type_fails() {
        let src = r#"
[workflow]
start_node = a
[node:a]
config = {}
"#;
        let err = parse_str(src, &base_dir()).unwrap_err();
        assert!(matches!(err, ParseError::MissingNodeType(ref id) if id == "a"));
    }

    #[test]
    fn triple_quote_block_captures_multiline_body() {
        let src = "[workflow]\nstart_node = a\n[node:a]\ntype = python\ncode = \"\"\"\nline one\nline two\n\"\"\"\n";
        let wf = parse_str(src, &base_dir()).unwrap();
        let code = wf.nodes["a"].params.get("code").unwrap();
        assert_eq!(code, &Value::String("line one\nline two".to_string()));
    }

    #[test]
    fn triple_quote_single_line_block() {
        let src = "[workflow]\nstart_node = a\n[node:a]\ntype = noop\nnote = \"\"\"hello\"\"\"\n";
        let wf = parse_str(src, &base_dir()).unwrap();
        assert_eq!(
            wf.nodes["a"].params.get("note").unwrap(),
            &Value::String("hello".to_string())
        );
    }

    #[test]
    fn header_like_line_inside_block_is_not_a_new_section() {
        let src = "[workflow]\nstart_node = a\n[node:a]\ntype = python\ncode = \"\"\"\n[not_a_section]\nstill_code\n\"\"\"\n";
        let wf = parse_str(src, &base_dir()).unwrap();
        let code = wf.nodes["a"].params.get("code").unwrap();
        assert_eq!(
            code,
            &Value::String("[not_a_section]\nstill_code".to_string())
        );
    }

    #[test]
    fn multiline_json_is_decoded() {
        let src = "[workflow]\nstart_node = a\n[node:a]\ntype = noop\nheaders = {\n  \"a\": 1,\n  \"b\": 2\n}\n";
        let wf = parse_str(src, &base_dir()).unwrap();
        assert!(matches!(wf.nodes["a"].params.get("headers"), Some(Value::Map(_))));
    }

    #[test]
    fn edges_strip_trailing_comments_and_append() {
        let src = r#"
[workflow]
start_node = a
[node:a]
type = noop
[node:b]
type = noop
[node:c]
type = noop
[edges]
a = b # first hop
a = c ; second hop
"#;
        let wf = parse_str(src, &base_dir()).unwrap();
        assert_eq!(wf.successors("a"), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn env_section_resolves_sole_var() {
        std::env::set_var("PARSER_TEST_VAR", "resolved-value");
        let src = "[workflow]\nstart_node = a\n[node:a]\ntype = noop\n[env]\nAPI_KEY = ${PARSER_TEST_VAR}\n";
        let wf = parse_str(src, &base_dir()).unwrap();
        assert_eq!(wf.env.get("API_KEY").unwrap(), "resolved-value");
    }

    #[test]
    fn static_parameter_substitution_runs_outside_parameters_and_env() {
        let src = r#"
[workflow]
start_node = a
[parameters]
base_url = https://example.test
[node:a]
type = noop
url = {{.Parameter.base_url}}/ping
"#;
        let wf = parse_str(src, &base_dir()).unwrap();
        assert_eq!(
            wf.nodes["a"].params.get("url").unwrap(),
            &Value::String("https://example.test/ping".to_string())
        );
    }

    #[test]
    fn malformed_header_is_rejected() {
        let src = "[workflow\nstart_node = a\n";
        let err = parse_str(src, &base_dir()).unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader(_)));
    }
}
