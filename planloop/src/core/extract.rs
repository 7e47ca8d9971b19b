//! Extraction of a plan payload from raw oracle text.
//!
//! Oracle output is untrusted free text: the payload may be wrapped in prose,
//! code fences, or reasoning-trace tags. Extraction locates the first fragment
//! that parses as a plan payload; anything else is a [`ParseFailure`] the
//! lifecycle recovers from by replanning.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Raised when no plan-shaped payload can be located in oracle output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub reason: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no plan payload in oracle output: {}", self.reason)
    }
}

impl std::error::Error for ParseFailure {}

/// Extract the first plan-shaped JSON object from raw oracle text.
///
/// Reasoning-trace tags are stripped first. Fenced code blocks are tried in
/// order, then balanced `{...}` fragments of the remaining text. A fragment
/// qualifies when it parses as an object whose `plan` key holds an array.
pub fn extract_plan_payload(raw: &str) -> Result<Value, ParseFailure> {
    let stripped = THINK_RE.replace_all(raw, "");
    let text = stripped.trim();
    if text.is_empty() {
        return Err(ParseFailure {
            reason: "output is empty after removing reasoning tags".to_string(),
        });
    }

    for caps in FENCE_RE.captures_iter(text) {
        if let Some(block) = caps.get(1)
            && let Some(payload) = parse_candidate(block.as_str())
        {
            return Ok(payload);
        }
    }

    for fragment in brace_fragments(text) {
        if let Some(payload) = parse_candidate(fragment) {
            return Ok(payload);
        }
    }

    Err(ParseFailure {
        reason: "no object with a `plan` array found".to_string(),
    })
}

fn parse_candidate(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    is_plan_shaped(&value).then_some(value)
}

/// True when `value` is an object whose `plan` key holds an array.
fn is_plan_shaped(value: &Value) -> bool {
    value.get("plan").is_some_and(Value::is_array)
}

/// Top-level `{...}` fragments of `text`, in order of appearance.
///
/// String literals and escapes are tracked inside fragments so braces within
/// JSON strings do not unbalance the scan. Quotes outside any fragment are
/// plain prose and ignored.
fn brace_fragments(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        fragments.push(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    fragments
}
