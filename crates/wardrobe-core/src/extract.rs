//! Response extraction and validation.
//!
//! Reasoning output is untrusted text. It may be wrapped in markdown fences,
//! surrounded by prose, truncated, or simply not JSON. Extraction runs in
//! fixed steps:
//!
//! 1. [`strip_wrapping`] removes code-fence markers.
//! 2. [`locate_json`] takes the span from the first opening delimiter of the
//!    expected shape to the last matching closing delimiter.
//! 3. The span is parsed with `serde_json`; failure is
//!    [`ExtractError::Malformed`].
//! 4. The parsed value is checked against the expected shape.
//! 5. Identifiers are coerced to integers and sanitized against the
//!    [`CandidateSet`] the model was shown. Unusable ids are dropped; an empty
//!    result is [`ExtractError::NoSelection`].
//!
//! This layer never retries. That decision belongs to the agent.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::retrieve::CandidateSet;

/// Why a reasoning response could not be turned into a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("malformed reasoning response: {0}")]
    Malformed(String),
    #[error("reasoning response selected no usable items")]
    NoSelection,
}

/// Expected top-level JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    List,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            JsonShape::Object => ('{', '}'),
            JsonShape::List => ('[', ']'),
        }
    }

    fn name(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::List => "list",
        }
    }
}

/// A validated selection. Every id is a member of the candidate set it was
/// checked against, in the order the model gave, without repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDecision {
    pub explanation: Option<String>,
    pub item_ids: Vec<i64>,
}

const FENCE_MARKERS: &[&str] = &["```json", "```JSON", "```"];

/// Remove markdown code-fence markers.
pub fn strip_wrapping(raw: &str) -> String {
    let mut text = raw.to_string();
    for marker in FENCE_MARKERS {
        text = text.replace(marker, "");
    }
    text.trim().to_string()
}

/// Return the substring from the first opening delimiter to the last closing
/// delimiter of `shape`, if both exist in that order.
pub fn locate_json(text: &str, shape: JsonShape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Strip, locate and parse the JSON value of the expected shape.
pub fn extract_value(raw: &str, shape: JsonShape) -> Result<Value, ExtractError> {
    let stripped = strip_wrapping(raw);
    let span = locate_json(&stripped, shape).ok_or_else(|| {
        ExtractError::Malformed(format!("no JSON {} found in response", shape.name()))
    })?;
    let value: Value = serde_json::from_str(span)
        .map_err(|e| ExtractError::Malformed(format!("invalid JSON: {}", e)))?;

    let shape_ok = match shape {
        JsonShape::Object => value.is_object(),
        JsonShape::List => value.is_array(),
    };
    if !shape_ok {
        return Err(ExtractError::Malformed(format!(
            "expected a JSON {}",
            shape.name()
        )));
    }
    Ok(value)
}

/// Extract a JSON object and deserialize it into `T`.
pub fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractError> {
    let value = extract_value(raw, JsonShape::Object)?;
    serde_json::from_value(value)
        .map_err(|e| ExtractError::Malformed(format!("unexpected object fields: {}", e)))
}

/// Coerce a model-supplied identifier to an integer.
///
/// Accepts integers, whole finite floats and strings holding an integer.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Coerce, filter to candidate members and dedupe (first occurrence wins).
pub fn sanitize_ids(raw: &[Value], candidates: &CandidateSet) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::with_capacity(raw.len());
    for id in raw.iter().filter_map(coerce_id) {
        if candidates.contains(id) && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn non_empty(ids: Vec<i64>) -> Result<Vec<i64>, ExtractError> {
    if ids.is_empty() {
        Err(ExtractError::NoSelection)
    } else {
        Ok(ids)
    }
}

/// Parse a stylist response: `{"explanation": string, "item_ids": [..]}`.
pub fn parse_stylist_decision(
    raw: &str,
    candidates: &CandidateSet,
) -> Result<AgentDecision, ExtractError> {
    let value = extract_value(raw, JsonShape::Object)?;

    let explanation = value
        .get("explanation")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractError::Malformed("missing string field `explanation`".into()))?;
    let ids = value
        .get("item_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::Malformed("missing list field `item_ids`".into()))?;

    Ok(AgentDecision {
        explanation: Some(explanation.to_string()),
        item_ids: non_empty(sanitize_ids(ids, candidates))?,
    })
}

/// Parse a visual-match response: a bare list of ids.
pub fn parse_visual_selection(
    raw: &str,
    candidates: &CandidateSet,
) -> Result<AgentDecision, ExtractError> {
    let value = extract_value(raw, JsonShape::List)?;
    let ids = value.as_array().map(Vec::as_slice).unwrap_or_default();
    Ok(AgentDecision {
        explanation: None,
        item_ids: non_empty(sanitize_ids(ids, candidates))?,
    })
}
