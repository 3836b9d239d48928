use super::Rule;
use crate::core::ast::{named_children, node_line, PythonSource};
use crate::errors::Result;
use std::collections::HashMap;
use tree_sitter::Node;

/// Flags the same import appearing more than once in a fragment.
pub struct DuplicateImportRule;

impl Rule for DuplicateImportRule {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn check(&self, source: &PythonSource) -> Result<Vec<String>> {
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut issues = Vec::new();

        for (key, line) in collect_imports(source)? {
            match first_seen.get(&key) {
                Some(first_line) => issues.push(format!(
                    "Duplicate import '{key}' (first imported on line {first_line}, again on line {line})"
                )),
                None => {
                    first_seen.insert(key, line);
                }
            }
        }

        Ok(issues)
    }
}

/// Every imported binding as a normalized key with its line, in document order.
fn collect_imports(source: &PythonSource) -> Result<Vec<(String, usize)>> {
    let mut imports = Vec::new();
    let mut stack = vec![source.root()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                for name in imported_names(node) {
                    let key = format!("import {}", import_target(name, source)?);
                    imports.push((key, node_line(node)));
                }
            }
            "import_from_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|m| source.text(m))
                    .transpose()?
                    .unwrap_or("");
                let names = imported_names(node);
                if names.is_empty() {
                    imports.push((format!("from {module} import *"), node_line(node)));
                }
                for name in names {
                    let key = format!("from {module} import {}", import_target(name, source)?);
                    imports.push((key, node_line(node)));
                }
            }
            _ => {
                let mut children = named_children(node);
                children.reverse();
                stack.extend(children);
            }
        }
    }

    Ok(imports)
}

fn imported_names(statement: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = statement.walk();
    let names = statement
        .children_by_field_name("name", &mut cursor)
        .collect();
    names
}

/// `a.b` for plain names, `a.b as c` for aliased imports.
fn import_target(name: Node<'_>, source: &PythonSource) -> Result<String> {
    if name.kind() != "aliased_import" {
        return Ok(source.text(name)?.to_string());
    }
    let target = name
        .child_by_field_name("name")
        .map(|n| source.text(n))
        .transpose()?
        .unwrap_or("");
    match name.child_by_field_name("alias") {
        Some(alias) => Ok(format!("{target} as {}", source.text(alias)?)),
        None => Ok(target.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn check(code: &str) -> Vec<String> {
        let parsed = PythonSource::parse(code).unwrap();
        DuplicateImportRule.check(&parsed).unwrap()
    }

    #[test]
    fn test_distinct_imports_pass() {
        let issues = check(indoc! {r#"
            import os
            import os.path
            from collections import deque, Counter
            import numpy as np
        "#});
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_duplicate_plain_import() {
        let issues = check("import os\nimport sys\nimport os\n");
        assert_eq!(
            issues,
            vec!["Duplicate import 'import os' (first imported on line 1, again on line 3)".to_string()]
        );
    }

    #[test]
    fn test_duplicate_from_import_inside_function() {
        let issues = check(indoc! {r#"
            from typing import List

            def f():
                from typing import List
                return List
        "#});
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("from typing import List"));
    }

    #[test]
    fn test_alias_distinguishes_imports() {
        let issues = check("import numpy as np\nimport numpy as npy\nimport numpy as np\n");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("numpy as np'"));
    }
}
