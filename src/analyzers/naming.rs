use super::Rule;
use crate::core::ast::{named_children, PythonSource};
use crate::errors::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

static SNAKE_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(_{0,2}[a-z][a-z0-9_]*|__[a-z][a-z0-9_]*__)$").unwrap());
static PASCAL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_?[A-Z][a-zA-Z0-9]*$").unwrap());
static ALL_CAPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_?[A-Z][A-Z0-9_]+$").unwrap());

/// Functions are lower_snake_case, classes PascalCase, and ALL_CAPS names
/// hold literal values.
pub struct NamingRule;

impl Rule for NamingRule {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn check(&self, source: &PythonSource) -> Result<Vec<String>> {
        let mut issues = Vec::new();
        let mut stack = vec![source.root()];

        while let Some(node) = stack.pop() {
            match node.kind() {
                "function_definition" => {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        let name = source.text(name_node)?;
                        if !SNAKE_CASE.is_match(name) {
                            issues.push(format!(
                                "Function name '{name}' should be lower_snake_case"
                            ));
                        }
                    }
                }
                "class_definition" => {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        let name = source.text(name_node)?;
                        if !PASCAL_CASE.is_match(name) {
                            issues.push(format!("Class name '{name}' should be PascalCase"));
                        }
                    }
                }
                "assignment" => {
                    if let Some(issue) = check_constant(node, source)? {
                        issues.push(issue);
                    }
                }
                _ => {}
            }
            let mut children = named_children(node);
            children.reverse();
            stack.extend(children);
        }

        Ok(issues)
    }
}

fn check_constant(assignment: Node<'_>, source: &PythonSource) -> Result<Option<String>> {
    let Some(left) = assignment.child_by_field_name("left") else {
        return Ok(None);
    };
    if left.kind() != "identifier" {
        return Ok(None);
    }
    let name = source.text(left)?;
    if !ALL_CAPS.is_match(name) {
        return Ok(None);
    }

    // Chained `A = B = value` nests assignments on the right.
    let mut right = assignment.child_by_field_name("right");
    while let Some(node) = right.filter(|n| n.kind() == "assignment") {
        right = node.child_by_field_name("right");
    }

    match right {
        Some(value) if !is_literal(value) => Ok(Some(format!(
            "Constant '{name}' should be assigned a literal value"
        ))),
        _ => Ok(None),
    }
}

/// Literals, containers of literals, and arithmetic over literals.
fn is_literal(node: Node<'_>) -> bool {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "integer" | "float" | "string" | "concatenated_string" | "true" | "false" | "none" => {}
            "unary_operator" | "parenthesized_expression" | "tuple" | "list" | "set" => {
                stack.extend(named_children(node));
            }
            "binary_operator" => {
                for field in ["left", "right"] {
                    match node.child_by_field_name(field) {
                        Some(side) => stack.push(side),
                        None => return false,
                    }
                }
            }
            "dictionary" => {
                for pair in named_children(node) {
                    match pair.kind() {
                        "comment" => {}
                        "pair" => {
                            for field in ["key", "value"] {
                                match pair.child_by_field_name(field) {
                                    Some(side) => stack.push(side),
                                    None => return false,
                                }
                            }
                        }
                        _ => return false,
                    }
                }
            }
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn check(code: &str) -> Vec<String> {
        let parsed = PythonSource::parse(code).unwrap();
        NamingRule.check(&parsed).unwrap()
    }

    #[test]
    fn test_conventional_names_pass() {
        let issues = check(indoc! {r#"
            MAX_SIZE = 10
            TIMEOUTS = (1, 2.5, -3)
            HEADERS = {"a": "b"}
            SECONDS = 60 * 60

            class HttpClient:
                def __init__(self):
                    self.x = 1

                def _private_helper(self):
                    pass

            def compute_total(items):
                return sum(items)
        "#});
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_bad_function_and_class_names() {
        let issues = check(indoc! {r#"
            class http_client:
                pass

            def ComputeTotal():
                pass
        "#});
        assert_eq!(
            issues,
            vec![
                "Class name 'http_client' should be PascalCase".to_string(),
                "Function name 'ComputeTotal' should be lower_snake_case".to_string(),
            ]
        );
    }

    #[test]
    fn test_constant_assigned_from_call() {
        let issues = check("CONFIG = load_config()\nA = B = 1\n");
        assert_eq!(
            issues,
            vec!["Constant 'CONFIG' should be assigned a literal value".to_string()]
        );
    }

    #[test]
    fn test_deeply_parenthesized_constant() {
        let depth = 5_000;
        let literal = format!("LIMIT = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        let computed = format!("LIMIT = {}f(){}\n", "(".repeat(depth), ")".repeat(depth));
        let (literal, computed) = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || (check(&literal), check(&computed)))
            .unwrap()
            .join()
            .unwrap();
        assert!(literal.is_empty(), "{literal:?}");
        assert_eq!(computed.len(), 1);
    }
}
