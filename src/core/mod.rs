pub mod ast;
pub mod cache;

use crate::complexity::ComplexityReport;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Source tags identifying which layer produced a verdict.
pub mod source {
    pub const STATIC_ANALYSIS: &str = "static_analysis";
    pub const EMBEDDINGS: &str = "embeddings";
    pub const EXTRACTION: &str = "extraction";
    pub const FILESYSTEM: &str = "filesystem";

    /// Tag for verdicts produced by a paid model.
    pub fn model(name: &str) -> String {
        format!("model:{name}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    MostlyValid,
    NotValid,
    Error,
    Unknown,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "VALID",
            ValidationStatus::MostlyValid => "MOSTLY_VALID",
            ValidationStatus::NotValid => "NOT_VALID",
            ValidationStatus::Error => "ERROR",
            ValidationStatus::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse used for model replies: case-insensitive, accepts
    /// spaces or dashes in place of underscores.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "VALID" => Some(ValidationStatus::Valid),
            "MOSTLY_VALID" => Some(ValidationStatus::MostlyValid),
            "NOT_VALID" | "INVALID" => Some(ValidationStatus::NotValid),
            "ERROR" => Some(ValidationStatus::Error),
            "UNKNOWN" => Some(ValidationStatus::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What part of a program a fragment represents.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Function,
    Class,
}

impl Scope {
    pub fn describe(&self) -> &'static str {
        match self {
            Scope::All => "module",
            Scope::Function => "function",
            Scope::Class => "class",
        }
    }
}

/// One unit of work: a fragment, optionally narrowed to a named function
/// and tagged with the file it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationRequest {
    pub code: String,
    pub scope: Scope,
    pub file_path: Option<PathBuf>,
    pub function_name: Option<String>,
}

impl ValidationRequest {
    pub fn new(code: impl Into<String>, scope: Scope) -> Self {
        Self {
            code: code.into(),
            scope,
            file_path: None,
            function_name: None,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }
}

/// The outcome of validating one fragment, whichever layer produced it.
///
/// Field names are part of the JSON compatibility contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub status: ValidationStatus,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_analysis: Option<ComplexityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_key: Option<String>,
}

impl Verdict {
    pub fn new(
        status: ValidationStatus,
        confidence: f64,
        explanation: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            status,
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
            suggestions: Vec::new(),
            source: source.into(),
            cost: 0.0,
            execution_time: 0.0,
            complexity_analysis: None,
            similarity: None,
            file_path: None,
            pattern_key: None,
        }
    }

    /// ERROR verdict with zero confidence and zero cost.
    pub fn error(explanation: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(ValidationStatus::Error, 0.0, explanation, source)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost.max(0.0);
        self
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_complexity(mut self, report: ComplexityReport) -> Self {
        self.complexity_analysis = Some(report);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ValidationStatus::Error
    }

    /// Field-for-field equality, ignoring `execution_time`.
    pub fn same_outcome(&self, other: &Verdict) -> bool {
        let mut a = self.clone();
        a.execution_time = other.execution_time;
        a == *other
    }
}

/// Deterministic SHA-256 content hash, hex encoded.
pub fn content_hash(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ValidationStatus::MostlyValid).unwrap();
        assert_eq!(json, "\"MOSTLY_VALID\"");
        let back: ValidationStatus = serde_json::from_str("\"NOT_VALID\"").unwrap();
        assert_eq!(back, ValidationStatus::NotValid);
    }

    #[test]
    fn test_parse_lenient_status() {
        assert_eq!(
            ValidationStatus::parse_lenient("mostly valid"),
            Some(ValidationStatus::MostlyValid)
        );
        assert_eq!(
            ValidationStatus::parse_lenient(" Not-Valid "),
            Some(ValidationStatus::NotValid)
        );
        assert_eq!(ValidationStatus::parse_lenient("great"), None);
    }

    #[test]
    fn test_verdict_json_omits_absent_optionals() {
        let verdict = Verdict::new(ValidationStatus::Valid, 0.7, "ok", source::STATIC_ANALYSIS);
        let value = serde_json::to_value(&verdict).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "status",
            "confidence",
            "explanation",
            "suggestions",
            "source",
            "cost",
            "execution_time",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(!obj.contains_key("similarity"));
        assert!(!obj.contains_key("file_path"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let verdict = Verdict::new(ValidationStatus::Valid, 1.7, "", "x");
        assert_eq!(verdict.confidence, 1.0);
        let verdict = Verdict::new(ValidationStatus::Valid, -0.2, "", "x");
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        assert_eq!(content_hash("def f(): pass"), content_hash("def f(): pass"));
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn test_same_outcome_ignores_execution_time() {
        let mut a = Verdict::new(ValidationStatus::Valid, 0.7, "ok", "x");
        let mut b = a.clone();
        a.execution_time = 0.5;
        b.execution_time = 0.01;
        assert!(a.same_outcome(&b));
        b.confidence = 0.8;
        assert!(!a.same_outcome(&b));
    }
}
