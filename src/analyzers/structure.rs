use super::{is_control_block, is_statement, Rule};
use crate::core::ast::{function_definitions, named_children, PythonSource};
use crate::errors::Result;
use tree_sitter::Node;

/// Flags functions that are too long or too deeply nested.
pub struct StructureRule {
    max_statements: usize,
    max_nesting: usize,
}

impl StructureRule {
    pub fn new(max_statements: usize, max_nesting: usize) -> Self {
        Self {
            max_statements,
            max_nesting,
        }
    }
}

impl Rule for StructureRule {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn check(&self, source: &PythonSource) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        for func in function_definitions(source.root()) {
            let name = func
                .child_by_field_name("name")
                .map(|n| source.text(n))
                .transpose()?
                .unwrap_or("<anonymous>");
            let Some(body) = func.child_by_field_name("body") else {
                continue;
            };

            let statements = count_statements(body);
            if statements > self.max_statements {
                issues.push(format!(
                    "Function '{name}' is too long ({statements} statements, max {})",
                    self.max_statements
                ));
            }

            let depth = nesting_depth(body);
            if depth > self.max_nesting {
                issues.push(format!(
                    "Function '{name}' has nesting depth {depth} (max {})",
                    self.max_nesting
                ));
            }
        }

        Ok(issues)
    }
}

fn count_statements(node: Node<'_>) -> usize {
    let mut count = 0;
    let mut stack = named_children(node);
    while let Some(child) = stack.pop() {
        count += usize::from(is_statement(child.kind()));
        stack.extend(named_children(child));
    }
    count
}

/// Deepest control-flow nesting below `node`; nested functions are measured
/// on their own.
fn nesting_depth(node: Node<'_>) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(node, 0)];
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        for child in named_children(node) {
            if child.kind() == "function_definition" {
                continue;
            }
            stack.push((child, depth + usize::from(is_control_block(child.kind()))));
        }
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn check(code: &str) -> Vec<String> {
        let parsed = PythonSource::parse(code).unwrap();
        StructureRule::new(50, 4).check(&parsed).unwrap()
    }

    #[test]
    fn test_shallow_function_has_no_issues() {
        let issues = check(indoc! {r#"
            def f(xs):
                for x in xs:
                    if x:
                        print(x)
        "#});
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_deep_nesting_is_flagged() {
        let issues = check(indoc! {r#"
            def deep(xs):
                for a in xs:
                    for b in xs:
                        if a:
                            while b:
                                with open(a) as fh:
                                    b -= 1
        "#});
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("'deep'"));
        assert!(issues[0].contains("nesting depth 5"));
    }

    #[test]
    fn test_long_function_is_flagged() {
        let mut code = String::from("def long_one():\n");
        for i in 0..51 {
            code.push_str(&format!("    x{i} = {i}\n"));
        }
        let issues = check(&code);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("51 statements"));
    }

    #[test]
    fn test_deep_expression_is_not_control_nesting() {
        let depth = 5_000;
        let code = format!(
            "def wrapped(x):\n    if x:\n        return {}x{}\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let issues = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || check(&code))
            .unwrap()
            .join()
            .unwrap();
        assert!(issues.is_empty(), "{issues:?}");
    }
}
