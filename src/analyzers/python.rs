use super::docstrings::DocstringRule;
use super::imports::DuplicateImportRule;
use super::naming::NamingRule;
use super::structure::StructureRule;
use super::Rule;
use crate::config::RulesConfig;
use crate::core::ast::{PythonSource, SyntaxError};
use crate::core::{source, ValidationStatus, Verdict};
use tracing::debug;

/// Confidence assigned to a fragment that fails to parse.
pub const SYNTAX_ERROR_CONFIDENCE: f64 = 0.95;
const CLEAN_CONFIDENCE: f64 = 0.7;

/// Zero-cost structural validation of Python fragments.
pub struct StaticRuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for StaticRuleEngine {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

impl StaticRuleEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            rules: vec![
                Box::new(StructureRule::new(
                    config.max_function_statements,
                    config.max_nesting_depth,
                )),
                Box::new(NamingRule),
                Box::new(DuplicateImportRule),
                Box::new(DocstringRule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Issue list for a fragment, or the syntax error that stopped parsing.
    pub fn issues(&self, code: &str) -> Result<Vec<String>, SyntaxError> {
        let parsed = PythonSource::parse(code)?;
        Ok(self.run_rules(&parsed))
    }

    /// Run every rule over an already parsed fragment.
    pub fn run_rules(&self, parsed: &PythonSource) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.check(parsed).unwrap_or_else(|e| {
                    debug!(rule = rule.name(), error = %e, "rule degraded to issue");
                    vec![format!("Rule '{}' could not complete: {e}", rule.name())]
                })
            })
            .collect()
    }

    pub fn validate(&self, code: &str) -> Verdict {
        match self.issues(code) {
            Ok(issues) => verdict_from_issues(issues),
            Err(err) => syntax_error_verdict(&err),
        }
    }
}

/// Zero issues is VALID at 0.7; otherwise NOT_VALID with confidence growing
/// by 0.1 per issue, capped at 0.95.
pub fn verdict_from_issues(issues: Vec<String>) -> Verdict {
    if issues.is_empty() {
        return Verdict::new(
            ValidationStatus::Valid,
            CLEAN_CONFIDENCE,
            "No issues found by static analysis.",
            source::STATIC_ANALYSIS,
        );
    }

    let confidence = (0.5 + 0.1 * issues.len() as f64).min(0.95);
    let explanation = format!(
        "Static analysis found {} issue{}.",
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    );
    Verdict::new(
        ValidationStatus::NotValid,
        confidence,
        explanation,
        source::STATIC_ANALYSIS,
    )
    .with_suggestions(issues)
}

pub fn syntax_error_verdict(err: &SyntaxError) -> Verdict {
    let issue = err.to_string();
    Verdict::new(
        ValidationStatus::NotValid,
        SYNTAX_ERROR_CONFIDENCE,
        format!("Code does not parse. {issue}"),
        source::STATIC_ANALYSIS,
    )
    .with_suggestions(vec![issue])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CodevetError, Result};
    use indoc::indoc;

    #[test]
    fn test_missing_docstring_scenario() {
        let verdict = StaticRuleEngine::default().validate("def f():\n    pass");
        assert_eq!(verdict.status, ValidationStatus::NotValid);
        assert!((verdict.confidence - 0.6).abs() < 1e-9);
        assert_eq!(verdict.suggestions.len(), 1);
        assert!(verdict.suggestions[0].contains("'f'"));
        assert!(verdict.suggestions[0].contains("docstring"));
        assert_eq!(verdict.cost, 0.0);
        assert_eq!(verdict.source, source::STATIC_ANALYSIS);
    }

    #[test]
    fn test_clean_code_is_valid() {
        let verdict = StaticRuleEngine::default().validate(indoc! {r#"
            def add(a, b):
                """Add two numbers."""
                return a + b
        "#});
        assert_eq!(verdict.status, ValidationStatus::Valid);
        assert!((verdict.confidence - 0.7).abs() < 1e-9);
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_syntax_error_stops_other_rules() {
        let verdict = StaticRuleEngine::default().validate("def f(:\n    pass");
        assert_eq!(verdict.status, ValidationStatus::NotValid);
        assert!(verdict.confidence >= 0.9);
        assert_eq!(verdict.suggestions.len(), 1);
        assert!(verdict.suggestions[0].starts_with("Syntax error at line"));
    }

    #[test]
    fn test_confidence_caps_at_095() {
        let verdict = StaticRuleEngine::default().validate(indoc! {r#"
            import os
            import os

            class bad_name:
                def BadMethod(self):
                    pass

            def AnotherBad():
                pass
        "#});
        assert_eq!(verdict.status, ValidationStatus::NotValid);
        assert!(verdict.suggestions.len() >= 5);
        assert!((verdict.confidence - 0.95).abs() < 1e-9);
    }

    struct FailingRule;

    impl Rule for FailingRule {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn check(&self, _source: &PythonSource) -> Result<Vec<String>> {
            Err(CodevetError::Cache("boom".into()))
        }
    }

    #[test]
    fn test_failing_rule_degrades_to_issue() {
        let engine = StaticRuleEngine::with_rules(vec![Box::new(FailingRule), Box::new(NamingRule)]);
        let verdict = engine.validate("def Bad():\n    pass");
        assert_eq!(verdict.suggestions.len(), 2);
        assert!(verdict.suggestions[0].contains("Rule 'failing' could not complete"));
        assert!(verdict.suggestions[1].contains("lower_snake_case"));
    }
}
