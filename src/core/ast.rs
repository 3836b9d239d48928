//! Tree-sitter integration for Python source.
//!
//! Wraps a parsed tree together with its source text and offers the small
//! set of traversal helpers the rule engine, the complexity classifier and
//! the function extractor share.

use crate::errors::{CodevetError, Result};
use tree_sitter::{Node, Parser, Tree};

/// Location and description of the first syntax error in a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Syntax error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl From<SyntaxError> for CodevetError {
    fn from(err: SyntaxError) -> Self {
        CodevetError::Parse {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

/// A successfully parsed Python fragment.
pub struct PythonSource {
    tree: Tree,
    source: String,
}

impl std::fmt::Debug for PythonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonSource")
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Parse Python source into a tree without rejecting error nodes.
fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CodevetError::Config(format!("Failed to load Python grammar: {e}")))?;
    parser.parse(source, None).ok_or_else(|| CodevetError::Parse {
        message: "parser produced no tree".to_string(),
        line: 1,
        column: 1,
    })
}

impl PythonSource {
    /// Parse a fragment, rejecting any tree that contains `ERROR` or
    /// `MISSING` nodes.
    pub fn parse(source: &str) -> std::result::Result<Self, SyntaxError> {
        let tree = parse_tree(source).map_err(|e| SyntaxError {
            line: 1,
            column: 1,
            message: e.to_string(),
        })?;

        if let Some(err) = first_syntax_error(tree.root_node(), source) {
            return Err(err);
        }

        Ok(Self {
            tree,
            source: source.to_string(),
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self, node: Node<'_>) -> Result<&str> {
        node_text(node, &self.source)
    }

    /// Find the first function definition (at any depth) with this name.
    pub fn find_function(&self, name: &str) -> Option<Node<'_>> {
        function_definitions(self.root()).into_iter().find(|node| {
            node.child_by_field_name("name")
                .and_then(|n| self.text(n).ok())
                .is_some_and(|text| text == name)
        })
    }

    /// Source lines spanned by `node`, widened to whole lines and including
    /// decorators when the node is a decorated definition's inner def.
    pub fn line_span(&self, node: Node<'_>) -> (usize, usize) {
        let outer = node
            .parent()
            .filter(|p| p.kind() == "decorated_definition")
            .unwrap_or(node);
        (outer.start_position().row, outer.end_position().row)
    }
}

/// Get text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> Result<&'a str> {
    node.utf8_text(source.as_bytes())
        .map_err(|e| CodevetError::Parse {
            message: format!("invalid UTF-8 in source: {e}"),
            line: node_line(node),
            column: node_column(node),
        })
}

/// Get the line number for a tree-sitter node (1-indexed).
pub fn node_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Get the column number for a tree-sitter node (1-indexed).
pub fn node_column(node: Node<'_>) -> usize {
    node.start_position().column + 1
}

/// All function definitions below `root` in document order.
pub fn function_definitions(root: Node<'_>) -> Vec<Node<'_>> {
    let mut functions = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "function_definition" {
            functions.push(node);
        }
        let mut children = named_children(node);
        children.reverse();
        stack.extend(children);
    }
    functions
}

/// Named children of a node, collected so the cursor borrow ends here.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// Statements of a `block` or `module`, skipping comments.
pub fn statements(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Unwrap a `decorated_definition` to the function or class it decorates.
pub fn unwrap_decorated(node: Node<'_>) -> Node<'_> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

/// Whether the first statement of a body is a string literal.
pub fn has_docstring(body: Node<'_>) -> bool {
    statements(body)
        .first()
        .filter(|stmt| stmt.kind() == "expression_statement")
        .and_then(|stmt| stmt.named_child(0))
        .is_some_and(|expr| matches!(expr.kind(), "string" | "concatenated_string"))
}

/// Locate the first `ERROR` or `MISSING` node in document order.
pub fn first_syntax_error(root: Node<'_>, source: &str) -> Option<SyntaxError> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return Some(SyntaxError {
                line: node_line(node),
                column: node_column(node),
                message: format!("missing '{}'", node.kind()),
            });
        }
        if node.is_error() {
            let snippet = node_text(node, source)
                .ok()
                .and_then(|text| text.lines().next())
                .map(|line| line.trim().chars().take(20).collect::<String>())
                .unwrap_or_default();
            let message = if snippet.is_empty() {
                "invalid syntax".to_string()
            } else {
                format!("unexpected '{snippet}'")
            };
            return Some(SyntaxError {
                line: node_line(node),
                column: node_column(node),
                message,
            });
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let mut children: Vec<Node> = node.children(&mut cursor).collect();
        children.reverse();
        stack.extend(children);
    }

    Some(SyntaxError {
        line: 1,
        column: 1,
        message: "invalid syntax".to_string(),
    })
}

/// Remove the common leading indentation of all non-blank lines.
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
