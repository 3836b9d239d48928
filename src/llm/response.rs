use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::ValidationStatus;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";

static STATUS_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"?status"?\s*[:=]\s*"?([A-Za-z_ \-]+?)"?\s*(?:[,}\n]|$)"#).unwrap());
static CONFIDENCE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"?confidence"?\s*[:=]\s*"?([0-9]*\.?[0-9]+)"#).unwrap());
static EXPLANATION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"explanation"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static SUGGESTIONS_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)"suggestions"\s*:\s*\[(.*?)\]"#).unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap());

/// A model reply reduced to the verdict fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub status: ValidationStatus,
    pub confidence: f64,
    pub explanation: String,
    pub suggestions: Vec<String>,
}

impl Default for ParsedResponse {
    fn default() -> Self {
        Self {
            status: ValidationStatus::Unknown,
            confidence: DEFAULT_CONFIDENCE,
            explanation: DEFAULT_EXPLANATION.to_string(),
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    suggestions: Option<Vec<Value>>,
}

/// Parse a model reply. Never fails: strict JSON first, then the outermost
/// `{...}` block, then field-by-field extraction with defaults.
pub fn parse_response(text: &str) -> ParsedResponse {
    let trimmed = text.trim();
    if let Ok(raw) = serde_json::from_str::<RawResponse>(trimmed) {
        return from_raw(raw);
    }

    if let Some(block) = outermost_object(trimmed) {
        if let Ok(raw) = serde_json::from_str::<RawResponse>(block) {
            return from_raw(raw);
        }
    }

    debug!(chars = text.len(), "model reply is not JSON; extracting fields");
    extract_fields(trimmed)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn from_raw(raw: RawResponse) -> ParsedResponse {
    let defaults = ParsedResponse::default();
    ParsedResponse {
        status: raw
            .status
            .as_deref()
            .and_then(ValidationStatus::parse_lenient)
            .unwrap_or(defaults.status),
        confidence: raw
            .confidence
            .as_ref()
            .and_then(confidence_from_value)
            .map(clamp_confidence)
            .unwrap_or(defaults.confidence),
        explanation: raw
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(defaults.explanation),
        suggestions: raw
            .suggestions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    }
}

fn confidence_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|v| {
            if s.trim().ends_with('%') {
                v / 100.0
            } else {
                v
            }
        }),
        _ => None,
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    }
}

fn extract_fields(text: &str) -> ParsedResponse {
    let defaults = ParsedResponse::default();

    let status = STATUS_FIELD
        .captures(text)
        .and_then(|c| ValidationStatus::parse_lenient(&c[1]))
        .unwrap_or(defaults.status);
    let confidence = CONFIDENCE_FIELD
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(clamp_confidence)
        .unwrap_or(defaults.confidence);
    let explanation = EXPLANATION_FIELD
        .captures(text)
        .map(|c| unescape(&c[1]))
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(defaults.explanation);
    let suggestions = SUGGESTIONS_FIELD
        .captures(text)
        .map(|c| {
            QUOTED
                .captures_iter(&c[1])
                .map(|item| unescape(&item[1]))
                .collect()
        })
        .unwrap_or_default();

    ParsedResponse {
        status,
        confidence,
        explanation,
        suggestions,
    }
}

fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}
