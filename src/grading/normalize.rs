//! Coercion of model replies into [`Feedback`].
//!
//! Models wrap JSON in Markdown fences, rename keys, return scores as
//! strings like `"8/10"` and lists as bullet-point paragraphs. Everything
//! here is total: any input yields a `Feedback`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::model::Feedback;

const SCORE_KEYS: &[&str] = &["score", "rating", "overallscore", "grade"];
const SUMMARY_KEYS: &[&str] = &["summary", "overall", "overallfeedback", "comment", "feedback"];
const STRENGTH_KEYS: &[&str] = &["strengths", "pros", "positives"];
const WEAKNESS_KEYS: &[&str] = &[
    "weaknesses",
    "areasforimprovement",
    "improvementsneeded",
    "cons",
];
const SUGGESTION_KEYS: &[&str] = &["suggestions", "recommendations", "improvements", "nextsteps"];
const WRAPPER_KEYS: &[&str] = &["feedback", "result", "evaluation"];
const ITEM_TEXT_KEYS: &[&str] = &["text", "point", "description", "title", "item"];

fn score_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:/\s*(\d+(?:\.\d+)?))?").ok())
        .as_ref()
}

fn bullet_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:[-*•·]+|\d+[.)])\s*").ok())
        .as_ref()
}

/// Normalize a raw model reply.
///
/// A reply with no recoverable JSON object becomes a zero-score feedback
/// whose summary is the reply text.
pub fn normalize_reply(raw: &str) -> Feedback {
    match extract_object(raw) {
        Some(object) => normalize_object(&object),
        None => Feedback {
            summary: raw.trim().to_string(),
            ..Feedback::default()
        },
    }
}

/// Normalize an already-parsed JSON value (e.g. uploaded by the browser).
pub fn normalize_value(value: &Value) -> Feedback {
    match value {
        Value::Object(object) => normalize_object(object),
        Value::String(raw) => normalize_reply(raw),
        _ => Feedback::default(),
    }
}

/// Find the JSON object inside a reply.
fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let text = strip_fences(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        match value {
            Value::Object(object) => return Some(object),
            // Double-encoded reply
            Value::String(inner) if inner.trim_start().starts_with('{') => {
                return extract_object(&inner)
            }
            _ => {}
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Return the body of the first fenced code block, or the input unchanged.
fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up the first present alias, ignoring case and separators.
fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .find(|(key, value)| canonical_key(key) == *alias && !value.is_null())
            .map(|(_, value)| value)
    })
}

fn normalize_object(object: &Map<String, Value>) -> Feedback {
    // Payload nested one level down, e.g. {"feedback": {"score": ..}}
    if field(object, SCORE_KEYS).is_none() {
        for key in WRAPPER_KEYS {
            if let Some(Value::Object(inner)) = field(object, &[*key]) {
                return normalize_object(inner);
            }
        }
    }

    Feedback {
        score: field(object, SCORE_KEYS).map_or(0, parse_score),
        summary: summary(object),
        strengths: field(object, STRENGTH_KEYS).map(to_list).unwrap_or_default(),
        weaknesses: field(object, WEAKNESS_KEYS).map(to_list).unwrap_or_default(),
        suggestions: field(object, SUGGESTION_KEYS).map(to_list).unwrap_or_default(),
    }
}

fn summary(object: &Map<String, Value>) -> String {
    SUMMARY_KEYS
        .iter()
        .filter_map(|key| field(object, &[*key]))
        .find_map(|value| value.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Score on a 0..=100 scale from a number or a string like "85%", "8/10".
pub fn parse_score(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_score_text(s),
        Value::Object(inner) => field(inner, &["value", "score"]).map(|v| parse_score(v) as f64),
        _ => None,
    };

    match raw {
        Some(score) if score.is_finite() => score.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn parse_score_text(text: &str) -> Option<f64> {
    let captures = score_regex()?.captures(text)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;

    match captures.get(2).and_then(|d| d.as_str().parse::<f64>().ok()) {
        Some(denominator) if denominator > 0.0 => Some(value / denominator * 100.0),
        _ => Some(value),
    }
}

/// Coerce a list-ish value into trimmed, de-duplicated strings.
pub fn to_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        Value::String(text) => split_text(text),
        Value::Number(n) => vec![n.to_string()],
        Value::Object(object) => object.values().filter_map(item_text).collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

fn item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(strip_bullet(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(object) => field(object, ITEM_TEXT_KEYS)
            .and_then(Value::as_str)
            .map(strip_bullet),
        _ => None,
    }
}

fn strip_bullet(line: &str) -> String {
    match bullet_regex() {
        Some(re) => re.replace(line, "").trim().to_string(),
        None => line.trim().to_string(),
    }
}

fn split_text(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.len() == 1 && lines[0].contains(';') {
        return lines[0].split(';').map(strip_bullet).collect();
    }

    lines.into_iter().map(strip_bullet).collect()
}
