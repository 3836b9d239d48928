//! Asymptotic growth classification for Python functions.
//!
//! The classifier walks each function's syntax tree looking for loop
//! nesting, halving/doubling loops, sorting calls and self-recursion, and
//! maps what it finds onto a fixed total order of growth classes. It is a
//! structural heuristic, not a proof: it never raises, and input that does
//! not parse yields a degenerate report with an `Unknown` overall class.

pub mod classifier;
pub mod growth;
pub mod suggestions;

pub use classifier::{analyze, analyze_source};
pub use growth::GrowthClass;

use serde::{Deserialize, Serialize};

/// Per-function growth estimate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionComplexity {
    pub name: String,
    pub line: usize,
    pub complexity: GrowthClass,
    pub max_loop_depth: usize,
    pub has_recursion: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComplexityReport {
    /// Highest class across all functions; `None` (serialized as
    /// `"Unknown"`) when the input did not parse.
    #[serde(with = "growth::overall")]
    pub overall_complexity: Option<GrowthClass>,
    pub functions: Vec<FunctionComplexity>,
    pub has_high_complexity: bool,
    pub optimization_opportunities: usize,
}

impl ComplexityReport {
    /// Report for input that could not be analyzed.
    pub fn unknown() -> Self {
        Self {
            overall_complexity: None,
            functions: Vec::new(),
            has_high_complexity: false,
            optimization_opportunities: 0,
        }
    }

    /// Build a report from per-function entries. With no entries the
    /// fragment is straight-line code and the overall class is O(1).
    pub fn from_functions(functions: Vec<FunctionComplexity>) -> Self {
        let overall = functions
            .iter()
            .map(|f| f.complexity)
            .max()
            .unwrap_or(GrowthClass::Constant);
        let has_high_complexity = functions
            .iter()
            .any(|f| f.complexity >= GrowthClass::Quadratic);
        let optimization_opportunities = functions.iter().map(|f| f.suggestions.len()).sum();

        Self {
            overall_complexity: Some(overall),
            functions,
            has_high_complexity,
            optimization_opportunities,
        }
    }

    /// One-paragraph summary suitable for a model prompt.
    pub fn summary(&self) -> String {
        let Some(overall) = self.overall_complexity else {
            return "Complexity could not be determined.".to_string();
        };
        let mut lines = vec![format!("Overall complexity: {overall}")];
        lines.extend(self.functions.iter().map(|f| {
            format!(
                "- {} (line {}): {}, loop depth {}{}",
                f.name,
                f.line,
                f.complexity,
                f.max_loop_depth,
                if f.has_recursion { ", recursive" } else { "" }
            )
        }));
        lines.join("\n")
    }
}
