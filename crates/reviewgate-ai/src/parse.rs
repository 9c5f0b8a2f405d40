//! Best-effort parsing of classifier output.
//!
//! The model may answer with bare JSON, JSON wrapped in a ```` ```json ```` fence,
//! JSON surrounded by prose, or something else entirely. Nothing here returns
//! an error: unusable answers resolve to a conservative fallback value.

use std::collections::HashSet;

use reviewgate_core::{Action, ClassificationResult, ReviewId, TopSelection};
use serde_json::{Map, Value};

/// Result of interpreting a classifier answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The answer was understood.
    Parsed(T),
    /// The answer was unusable; `value` is the conservative default.
    Fallback { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag, e.g. ```json
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Locate a JSON value in `text`: the whole fence-stripped text if it parses,
/// else the outermost `{...}` span.
fn find_json(text: &str) -> Result<Value, String> {
    let stripped = strip_fences(text);
    if stripped.is_empty() {
        return Err("empty response".to_string());
    }
    match serde_json::from_str::<Value>(stripped) {
        Ok(value) => Ok(value),
        Err(err) => {
            let span = stripped
                .find('{')
                .zip(stripped.rfind('}'))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &stripped[start..=end]);
            match span {
                Some(inner) => serde_json::from_str(inner).map_err(|e| format!("invalid JSON: {e}")),
                None => Err(format!("invalid JSON: {err}")),
            }
        }
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn review_id(value: &Value) -> Option<ReviewId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

// ── Single review ──

/// Interpret a single-review answer.
///
/// All three fields must be present and usable; scores are clamped into range.
pub fn parse_assessment(text: &str) -> Outcome<ClassificationResult> {
    match assessment(text) {
        Ok(result) => Outcome::Parsed(result),
        Err(reason) => Outcome::Fallback {
            value: ClassificationResult::FALLBACK,
            reason,
        },
    }
}

fn assessment(text: &str) -> Result<ClassificationResult, String> {
    let value = find_json(text)?;
    let obj = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;

    let safety = field(obj, &["safety_score"])
        .and_then(number)
        .ok_or("missing or non-numeric safety_score")?;
    let sentiment = field(obj, &["sentiment_score"])
        .and_then(number)
        .ok_or("missing or non-numeric sentiment_score")?;
    let action = field(obj, &["recommended_action", "action"])
        .and_then(Value::as_str)
        .ok_or("missing recommended_action")?;
    let action = Action::parse(action).ok_or_else(|| format!("unknown action `{action}`"))?;

    Ok(ClassificationResult::clamped(safety, sentiment, action))
}

// ── Top-K selection ──

/// Interpret a top-K selection answer.
///
/// Ids may be numbers or numeric strings; anything else is skipped and
/// duplicates keep their first position. The ids are not yet validated
/// against any business.
pub fn parse_selection(text: &str) -> Outcome<TopSelection> {
    match selection(text) {
        Ok(sel) => Outcome::Parsed(sel),
        Err(reason) => Outcome::Fallback {
            value: TopSelection::empty(format!("selection unavailable: {reason}")),
            reason,
        },
    }
}

fn selection(text: &str) -> Result<TopSelection, String> {
    let value = find_json(text)?;
    let (ids, reasoning) = match &value {
        Value::Object(obj) => {
            let ids = field(obj, &["top_review_ids"])
                .and_then(Value::as_array)
                .ok_or("missing top_review_ids array")?;
            let reasoning = field(obj, &["reasoning"])
                .and_then(Value::as_str)
                .unwrap_or_default();
            (ids, reasoning)
        }
        // A bare array of ids is still a usable answer.
        Value::Array(ids) => (ids, ""),
        _ => return Err("response is not a JSON object".to_string()),
    };

    let mut seen = HashSet::new();
    let top_review_ids = ids
        .iter()
        .filter_map(review_id)
        .filter(|id| seen.insert(*id))
        .collect();

    Ok(TopSelection {
        top_review_ids,
        reasoning: reasoning.to_string(),
    })
}
