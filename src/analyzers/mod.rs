//! Free, deterministic static checks over Python syntax trees.
//!
//! Each check is a [`Rule`]. The [`python::StaticRuleEngine`] parses a
//! fragment once and runs every rule over the same tree; a rule that fails
//! internally contributes a single issue describing the failure instead of
//! aborting the whole check.

use crate::core::ast::PythonSource;
use crate::errors::Result;

pub mod docstrings;
pub mod imports;
pub mod naming;
pub mod python;
pub mod structure;

pub use python::StaticRuleEngine;

/// A single structural check producing human-readable issue strings.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, source: &PythonSource) -> Result<Vec<String>>;
}

/// Kinds that count as one statement when measuring function length.
pub(crate) fn is_statement(kind: &str) -> bool {
    kind.ends_with("_statement") || matches!(kind, "function_definition" | "class_definition")
}

/// Kinds that open a new level of control-flow nesting.
pub(crate) fn is_control_block(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "for_statement"
            | "while_statement"
            | "try_statement"
            | "with_statement"
            | "match_statement"
    )
}
