//! Tolerant JSON extraction from free-form model output.
//!
//! Models wrap their answer in narration, markdown fences, or both. Three
//! strategies are tried in order and the first success wins:
//!
//! 1. Direct parse of the trimmed input.
//! 2. The first ```` ``` ```` / ```` ```json ```` fenced block.
//! 3. The first balanced `{…}` or `[…]` span that parses.
//!
//! Each strategy is a pure `&str -> Option<Value>` function. Typed
//! validation runs exactly once, after a raw value has been found.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct", direct_parse),
    ("fence", fenced_block),
    ("span", balanced_span),
];

/// A validated value: either one item or a list validated element-wise.
#[derive(Debug, Clone, PartialEq)]
pub enum Typed<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Typed<T> {
    /// The single value. A one-element list is unwrapped.
    pub fn single(self) -> Result<T, ParseError> {
        match self {
            Typed::One(value) => Ok(value),
            Typed::Many(mut items) if items.len() == 1 => Ok(items.remove(0)),
            Typed::Many(items) => Err(ParseError::UnexpectedList(items.len())),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Typed::One(value) => vec![value],
            Typed::Many(items) => items,
        }
    }
}

/// Extract the raw JSON value embedded in `text`.
pub fn parse_json(text: &str) -> Result<Value, ParseError> {
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(text) {
            debug!(strategy = name, "extracted json");
            return Ok(value);
        }
    }
    debug!(len = text.len(), "no json found");
    Err(ParseError::NoJson)
}

/// Extract JSON and validate it as `T` (element-wise when it is a list).
pub fn parse_json_typed<T: DeserializeOwned>(text: &str) -> Result<Typed<T>, ParseError> {
    match parse_json(text)? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map(Typed::Many)
            .map_err(ParseError::Invalid),
        value => serde_json::from_value(value)
            .map(Typed::One)
            .map_err(ParseError::Invalid),
    }
}

/// Extract JSON expected to hold exactly one `T`.
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    parse_json_typed(text)?.single()
}

/// Extract JSON as a list of `T`; a lone value becomes a one-element list.
pub fn parse_json_list<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, ParseError> {
    Ok(parse_json_typed(text)?.into_vec())
}

fn direct_parse(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Parse the interior of the first fence tagged `json` or untagged.
///
/// Fences must start a line. JSON strings cannot hold raw newlines, so a
/// fence embedded in a string value never qualifies as a delimiter.
fn fenced_block(text: &str) -> Option<Value> {
    enum State<'a> {
        Outside,
        OtherFence,
        JsonFence(Vec<&'a str>),
    }

    let mut state = State::Outside;
    for line in text.lines() {
        let trimmed = line.trim();
        state = match state {
            State::Outside => match trimmed.strip_prefix("```") {
                Some(tag) if is_json_tag(tag) => State::JsonFence(Vec::new()),
                Some(_) => State::OtherFence,
                None => State::Outside,
            },
            State::OtherFence if trimmed == "```" => State::Outside,
            State::OtherFence => State::OtherFence,
            State::JsonFence(body) if trimmed == "```" => {
                return serde_json::from_str(body.join("\n").trim()).ok();
            }
            State::JsonFence(mut body) => {
                body.push(line);
                State::JsonFence(body)
            }
        };
    }
    None
}

fn is_json_tag(tag: &str) -> bool {
    let tag = tag.trim();
    tag.is_empty() || tag.eq_ignore_ascii_case("json")
}

/// Parse the first balanced object or array span, scanning left to right.
fn balanced_span(text: &str) -> Option<Value> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(['{', '[']) {
        let start = from + offset;
        if let Some(len) = span_len(&text[start..])
            && let Ok(value) = serde_json::from_str(&text[start..start + len])
        {
            return Some(value);
        }
        // Openers are ASCII, so `start + 1` stays on a char boundary.
        from = start + 1;
    }
    None
}

/// Byte length of the bracketed span opening at `candidate[0]`, honoring
/// string literals and escapes. `None` when brackets are unbalanced.
fn span_len(candidate: &str) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in candidate.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                let open = stack.pop()?;
                if (open == '{') != (ch == '}') {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
