use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::Verdict;

const MAX_TERMS: usize = 10;
const MAX_TERM_LEN: usize = 24;

static STOP_WORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "been", "before", "being", "but",
    "can", "code", "could", "does", "each", "for", "from", "has", "have", "into", "its", "may",
    "more", "most", "not", "one", "only", "other", "should", "some", "such", "than", "that",
    "the", "their", "them", "then", "there", "these", "this", "use", "was", "were", "when",
    "which", "while", "will", "with", "would", "you", "your",
];

/// Occurrence and replay counts for one pattern key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternStatistics {
    pub count: u64,
    pub cache_hits: u64,
}

/// Per-pattern record written to `patterns/{key}.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRecord {
    pub pattern_key: String,
    pub status: String,
    pub terms: Vec<String>,
    pub count: u64,
    pub cache_hits: u64,
    pub last_seen: DateTime<Utc>,
}

/// Aggregate statistics persisted as `pattern_stats.json`.
pub type PatternTable = BTreeMap<String, PatternStatistics>;

/// `status` followed by up to ten salient terms from the verdict's
/// explanation and suggestions, joined with `_`.
pub fn derive_pattern_key(verdict: &Verdict) -> String {
    let mut parts = vec![verdict.status.as_str().to_lowercase()];
    parts.extend(salient_terms(verdict));
    parts.join("_")
}

/// The terms of a pattern key, most frequent first.
pub fn salient_terms(verdict: &Verdict) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let text = std::iter::once(verdict.explanation.as_str())
        .chain(verdict.suggestions.iter().map(String::as_str));

    let mut position = 0;
    for chunk in text {
        for word in chunk.split(|c: char| !c.is_ascii_alphabetic()) {
            if word.len() < 3 {
                continue;
            }
            let term = word.to_ascii_lowercase();
            if STOP_WORDS.contains(&term.as_str()) {
                continue;
            }
            let slot = counts.entry(term).or_insert((0, position));
            slot.0 += 1;
            position += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(MAX_TERMS)
        .map(|(mut term, _, _)| {
            term.truncate(MAX_TERM_LEN);
            term
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValidationStatus;

    #[test]
    fn test_key_starts_with_status_and_filters_stop_words() {
        let verdict = Verdict::new(
            ValidationStatus::NotValid,
            0.6,
            "Static analysis found 1 issue(s).",
            "static_analysis",
        )
        .with_suggestions(vec!["Function 'f' is missing a docstring".to_string()]);

        let key = derive_pattern_key(&verdict);
        assert!(key.starts_with("not_valid_"));
        assert!(key.contains("docstring"));
        assert!(!key.split('_').any(|t| t == "the" || t == "is"));
    }

    #[test]
    fn test_at_most_ten_terms() {
        let words = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima";
        let verdict = Verdict::new(ValidationStatus::Valid, 0.9, words, "test");
        assert_eq!(salient_terms(&verdict).len(), 10);
        assert_eq!(salient_terms(&verdict)[0], "alpha");
    }

    #[test]
    fn test_frequent_terms_rank_first() {
        let verdict = Verdict::new(
            ValidationStatus::NotValid,
            0.7,
            "nesting loops; loops again; loops",
            "test",
        );
        assert_eq!(salient_terms(&verdict)[0], "loops");
    }

    #[test]
    fn test_key_is_deterministic_and_path_safe() {
        let verdict = Verdict::new(ValidationStatus::MostlyValid, 0.8, "Ünïcode/../path", "t");
        let key = derive_pattern_key(&verdict);
        assert_eq!(key, derive_pattern_key(&verdict));
        assert!(key.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
    }
}
