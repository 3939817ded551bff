//! Enclosing-method resolution for Java sources using tree-sitter
//!
//! Given a Java file and a line number taken from a stack frame, find the
//! method declaration around that line and return its line range and text.

use super::ExtractError;
use serde::{Deserialize, Serialize};

/// Line range and text of one method declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpan {
    /// Method name, empty when the span is a fallback
    pub name: String,
    /// First line of the declaration (annotations and modifiers included)
    pub start_line: usize,
    /// Line of the last statement in the body, or `start_line` for bodiless methods
    pub end_line: usize,
    /// Source lines `start_line..=end_line + 1`
    pub text: String,
}

impl MethodSpan {
    /// Whether a 1-based line falls inside this method
    pub fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// Resolves the method enclosing a source line
pub struct MethodResolver {
    parser: tree_sitter::Parser,
}

impl MethodResolver {
    /// Create a new resolver with the Java grammar loaded
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ExtractError::ParserSetup(e.to_string()))?;

        Ok(Self { parser })
    }

    /// All method declarations in document order
    pub fn method_spans(&mut self, source: &str) -> Result<Vec<MethodSpan>, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(ExtractError::SourceParse { line: 0, column: 0 })?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error(root)
                .map(|node| {
                    let pos = node.start_position();
                    (pos.row + 1, pos.column + 1)
                })
                .unwrap_or((0, 0));
            return Err(ExtractError::SourceParse { line, column });
        }

        let lines: Vec<&str> = source.lines().collect();
        let mut spans = Vec::new();
        collect_methods(root, source, &lines, &mut spans);

        Ok(spans)
    }

    /// The method enclosing `line`.
    ///
    /// Falls back to the single target line when no method contains it, and
    /// to the whole source (lines `1..=len`) when the line lies outside the file.
    pub fn enclosing_method(&mut self, source: &str, line: usize) -> Result<MethodSpan, ExtractError> {
        let spans = self.method_spans(source)?;

        if let Some(span) = spans.into_iter().find(|span| span.contains(line)) {
            tracing::debug!(
                method = %span.name,
                start = span.start_line,
                end = span.end_line,
                "resolved enclosing method"
            );
            return Ok(span);
        }

        match line.checked_sub(1).and_then(|idx| source.lines().nth(idx)) {
            Some(text) => Ok(MethodSpan {
                name: String::new(),
                start_line: line,
                end_line: line,
                text: text.to_string(),
            }),
            None => {
                tracing::warn!(line, "target line outside the source file");
                Ok(MethodSpan {
                    name: String::new(),
                    start_line: 1,
                    end_line: source.lines().count(),
                    text: source.to_string(),
                })
            }
        }
    }
}

/// Pre-order walk collecting `method_declaration` nodes
fn collect_methods(
    node: tree_sitter::Node,
    source: &str,
    lines: &[&str],
    spans: &mut Vec<MethodSpan>,
) {
    if node.kind() == "method_declaration" {
        if let Some(span) = method_span(node, source, lines) {
            spans.push(span);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_methods(child, source, lines, spans);
    }
}

fn method_span(node: tree_sitter::Node, source: &str, lines: &[&str]) -> Option<MethodSpan> {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .unwrap_or_default();

    let start_line = node.start_position().row + 1;
    let end_line = last_statement_line(node).unwrap_or(start_line);

    // One trailing line past the last statement is kept, usually the closing brace
    let from = start_line - 1;
    let to = (end_line + 1).min(lines.len());
    if from >= to {
        return None;
    }

    Some(MethodSpan {
        name: name.to_string(),
        start_line,
        end_line,
        text: lines[from..to].join("\n"),
    })
}

/// Start line of the last statement in a method body
fn last_statement_line(node: tree_sitter::Node) -> Option<usize> {
    let body = node.child_by_field_name("body")?;

    let mut cursor = body.walk();
    let last = body
        .named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "line_comment" | "block_comment"))
        .last()?;

    Some(last.start_position().row + 1)
}

fn first_error(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}
