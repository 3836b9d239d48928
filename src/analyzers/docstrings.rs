use super::Rule;
use crate::core::ast::{has_docstring, named_children, statements, PythonSource};
use crate::errors::Result;

/// Flags modules, classes and functions without a docstring.
///
/// A fragment holding a single top-level statement is treated as a snippet
/// rather than a module, so only multi-statement fragments need a module
/// docstring. Dunder methods are exempt.
pub struct DocstringRule;

impl Rule for DocstringRule {
    fn name(&self) -> &'static str {
        "docstrings"
    }

    fn check(&self, source: &PythonSource) -> Result<Vec<String>> {
        let mut issues = Vec::new();
        let root = source.root();

        if statements(root).len() > 1 && !has_docstring(root) {
            issues.push("Module is missing a docstring".to_string());
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let kind = node.kind();
            if matches!(kind, "function_definition" | "class_definition") {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| source.text(n))
                    .transpose()?
                    .unwrap_or("<anonymous>");
                let documented = node
                    .child_by_field_name("body")
                    .is_some_and(has_docstring);
                let exempt = name.starts_with("__") && name.ends_with("__");

                if !documented && !exempt {
                    let label = if kind == "class_definition" {
                        "Class"
                    } else {
                        "Function"
                    };
                    issues.push(format!("{label} '{name}' is missing a docstring"));
                }
            }
            let mut children = named_children(node);
            children.reverse();
            stack.extend(children);
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn check(code: &str) -> Vec<String> {
        let parsed = PythonSource::parse(code).unwrap();
        DocstringRule.check(&parsed).unwrap()
    }

    #[test]
    fn test_single_undocumented_function() {
        assert_eq!(
            check("def f():\n    pass"),
            vec!["Function 'f' is missing a docstring".to_string()]
        );
    }

    #[test]
    fn test_fully_documented_module() {
        let issues = check(indoc! {r#"
            """Utilities."""

            class Stack:
                """A stack."""

                def __init__(self):
                    self.items = []

                def push(self, item):
                    """Push an item."""
                    self.items.append(item)
        "#});
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_module_class_and_method_flagged() {
        let issues = check(indoc! {r#"
            import os

            class Stack:
                # comments do not count as docstrings
                def push(self, item):
                    return item
        "#});
        assert_eq!(
            issues,
            vec![
                "Module is missing a docstring".to_string(),
                "Class 'Stack' is missing a docstring".to_string(),
                "Function 'push' is missing a docstring".to_string(),
            ]
        );
    }
}
