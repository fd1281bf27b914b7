//! Block forms — spec.md §4.2: `{{#if COND}} … [{{else}} …] {{/if}}` and
//! `{{#each PATH}} … {{/each}}` — recognized in a pre-pass before ordinary
//! `{{expr}}` substitution, exactly as spec.md §9 recommends a regex-driven
//! scanner. Blocks do not nest in this implementation; a nested `{{#if}}`
//! inside an `{{#each}}` body is expanded during that iteration's own pass.

use once_cell::sync::Lazy;
use regex::Regex;
use value::path::PathSegment;
use value::Value;

use crate::context::ResolutionContext;
use crate::error::ResolverError;
use crate::expr::eval;

static IF_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{#if\s+(.+?)\}\}").unwrap());
static EACH_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{#each\s+(.+?)\}\}").unwrap());
static ELSE_TAG: &str = "{{else}}";
static IF_CLOSE: &str = "{{/if}}";
static EACH_CLOSE: &str = "{{/each}}";

static THIS_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*this((?:\.[A-Za-z0-9_]+|\[\d+\])*)\s*\}\}").unwrap());
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*index\s*\}\}").unwrap());
static FIRST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*first\s*\}\}").unwrap());
static LAST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*last\s*\}\}").unwrap());
static LENGTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*length\s*\}\}").unwrap());

/// Expand every `{{#if}}`/`{{#each}}` block in `text`, returning the text
/// with each block replaced by its rendered branch/iterations. The result
/// may still contain ordinary `{{expr}}`/`${ENV}` tokens for the caller to
/// resolve afterward.
pub fn expand(text: &str, ctx: &ResolutionContext) -> Result<String, ResolverError> {
    let mut out = String::new();
    let mut rest = text;

    loop {
        let if_pos = IF_OPEN.find(rest).map(|m| m.start());
        let each_pos = EACH_OPEN.find(rest).map(|m| m.start());

        match (if_pos, each_pos) {
            (None, None) => {
                out.push_str(rest);
                return Ok(out);
            }
            (Some(ip), Some(ep)) if ep < ip => {
                let (before, expanded, remainder) = expand_each(rest, ctx)?;
                out.push_str(before);
                out.push_str(&expanded);
                rest = remainder;
            }
            (Some(_), _) => {
                let (before, expanded, remainder) = expand_if(rest, ctx)?;
                out.push_str(before);
                out.push_str(&expanded);
                rest = remainder;
            }
            (None, Some(_)) => {
                let (before, expanded, remainder) = expand_each(rest, ctx)?;
                out.push_str(before);
                out.push_str(&expanded);
                rest = remainder;
            }
        }
    }
}

fn expand_if<'a>(text: &'a str, ctx: &ResolutionContext) -> Result<(&'a str, String, &'a str), ResolverError> {
    let open = IF_OPEN
        .captures(text)
        .ok_or_else(|| ResolverError::MismatchedBlock(text.to_string()))?;
    let open_match = open.get(0).unwrap();
    let before = &text[..open_match.start()];
    let cond_text = open[1].to_string();
    let body_start = open_match.end();

    let close_idx = text[body_start..]
        .find(IF_CLOSE)
        .ok_or_else(|| ResolverError::MismatchedBlock(text.to_string()))?
        + body_start;
    let body = &text[body_start..close_idx];
    let after = &text[close_idx + IF_CLOSE.len()..];

    let (true_branch, false_branch) = match body.find(ELSE_TAG) {
        Some(else_idx) => (&body[..else_idx], &body[else_idx + ELSE_TAG.len()..]),
        None => (body, ""),
    };

    let cond_value = eval(&cond_text, ctx).unwrap_or(Value::Null);
    let chosen = if cond_value.is_truthy() { true_branch } else { false_branch };
    let expanded = expand(chosen, ctx)?;

    Ok((before, expanded, after))
}

fn expand_each<'a>(text: &'a str, ctx: &ResolutionContext) -> Result<(&'a str, String, &'a str), ResolverError> {
    let open = EACH_OPEN
        .captures(text)
        .ok_or_else(|| ResolverError::MismatchedBlock(text.to_string()))?;
    let open_match = open.get(0).unwrap();
    let before = &text[..open_match.start()];
    let path_text = open[1].to_string();
    let body_start = open_match.end();

    let close_idx = text[body_start..]
        .find(EACH_CLOSE)
        .ok_or_else(|| ResolverError::MismatchedBlock(text.to_string()))?
        + body_start;
    let body = &text[body_start..close_idx];
    let after = &text[close_idx + EACH_CLOSE.len()..];

    let resolved = eval(&path_text, ctx).unwrap_or(Value::Null);
    let items = match resolved {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    let length = items.len();

    let mut rendered = String::new();
    for (index, item) in items.into_iter().enumerate() {
        let bound = bind_locals(body, &item, index, length);
        rendered.push_str(&expand(&bound, ctx)?);
    }

    Ok((before, rendered, after))
}

fn bind_locals(body: &str, this: &Value, index: usize, length: usize) -> String {
    let with_this = THIS_PATH_RE.replace_all(body, |caps: &regex::Captures| {
        let suffix = &caps[1];
        if suffix.is_empty() {
            return this.stringify();
        }
        let segments = value::path::parse_path(suffix.trim_start_matches('.'));
        resolve_this_path(this, &segments)
    });
    let with_index = INDEX_RE.replace_all(&with_this, index.to_string());
    let with_first = FIRST_RE.replace_all(&with_index, (index == 0).to_string());
    let with_last = LAST_RE.replace_all(&with_first, (index + 1 == length).to_string());
    LENGTH_RE.replace_all(&with_last, length.to_string()).into_owned()
}

fn resolve_this_path(this: &Value, segments: &[PathSegment]) -> String {
    this.get_path(segments).map(Value::stringify).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_else_picks_matching_branch() {
        let ctx = ResolutionContext::new(Value::from(serde_json::json!({"flag": true})));
        let out = expand("{{#if input.flag}}yes{{else}}no{{/if}}", &ctx).unwrap();
        assert_eq!(out, "yes");
    }

    #[test]
    fn if_without_else_renders_empty_on_false() {
        let ctx = ResolutionContext::new(Value::from(serde_json::json!({"flag": false})));
        let out = expand("before-{{#if input.flag}}shown{{/if}}-after", &ctx).unwrap();
        assert_eq!(out, "before--after");
    }

    #[test]
    fn each_binds_this_index_first_last() {
        let ctx = ResolutionContext::new(Value::from(serde_json::json!({"items": ["a", "b"]})));
        let out = expand("{{#each input.items}}[{{index}}:{{this}}:{{first}}:{{last}}]{{/each}}", &ctx).unwrap();
        assert_eq!(out, "[0:a:true:false][1:b:false:true]");
    }

    #[test]
    fn missing_close_tag_is_mismatched_block() {
        let ctx = ResolutionContext::new(Value::Null);
        let err = expand("{{#if input.x}}oops", &ctx).unwrap_err();
        assert!(matches!(err, ResolverError::MismatchedBlock(_)));
    }
}
