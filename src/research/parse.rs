//! Parsing of raw model output into the structured shapes the loop consumes.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::query::GeneratedQuery;
use super::reflect::Reflection;
use crate::error::ParseError;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
static THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?think>").expect("valid regex"));

/// Remove `<think>...</think>` blocks and any stray tags, then trim.
///
/// An unclosed `<think>` keeps the text after it: only the tag itself goes.
pub fn strip_thinking_tokens(text: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(text, "");
    THINK_TAG.replace_all(&without_blocks, "").trim().to_string()
}

/// Find the JSON object in a model reply. Accepts bare JSON, fenced JSON,
/// or JSON surrounded by prose.
pub fn extract_json_object(text: &str) -> Result<Value, ParseError> {
    let cleaned = strip_thinking_tokens(text);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    let start = cleaned.find('{').ok_or(ParseError::NoJson)?;
    let end = cleaned.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }

    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ParseError::NoJson),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Expects `{"query": "...", "rationale": "..."}`; the rationale is optional.
pub fn parse_query(text: &str) -> Result<GeneratedQuery, ParseError> {
    let json = extract_json_object(text)?;
    let query = non_empty_str(&json, "query").ok_or(ParseError::MissingField("query"))?;
    Ok(GeneratedQuery {
        query,
        rationale: non_empty_str(&json, "rationale").unwrap_or_default(),
    })
}

/// Expects `{"knowledge_gap": "...", "follow_up_query": "..."}`. A blank or
/// absent follow-up query means no gap.
pub fn parse_reflection(text: &str) -> Result<Reflection, ParseError> {
    let json = extract_json_object(text)?;
    Ok(Reflection {
        knowledge_gap: non_empty_str(&json, "knowledge_gap").unwrap_or_default(),
        follow_up_query: non_empty_str(&json, "follow_up_query"),
    })
}
