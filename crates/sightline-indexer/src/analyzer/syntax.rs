//! Tree-sitter helpers shared by the grammar-backed analyzers.

use crate::model::AnalysisError;
use tree_sitter::{Language, Node, Parser, Tree};

/// Syntax errors reported per file before the rest are dropped.
pub(crate) const MAX_SYNTAX_ERRORS: usize = 20;

/// Parse a source text with a grammar.
pub(crate) fn parse(language: &Language, source: &str) -> Result<Tree, AnalysisError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| AnalysisError::new(format!("failed to load grammar: {}", e)))?;

    parser
        .parse(source, None)
        .ok_or_else(|| AnalysisError::new("parser produced no syntax tree"))
}

/// Collect `ERROR` and `MISSING` nodes as analysis errors.
pub(crate) fn syntax_errors(tree: &Tree) -> Vec<AnalysisError> {
    let mut errors = Vec::new();
    collect_errors(tree.root_node(), &mut errors);
    errors
}

fn collect_errors(node: Node, errors: &mut Vec<AnalysisError>) {
    if errors.len() >= MAX_SYNTAX_ERRORS {
        return;
    }

    let pos = node.start_position();
    if node.is_error() {
        errors.push(AnalysisError::at("invalid syntax", pos.row + 1, pos.column));
        return;
    }
    if node.is_missing() {
        errors.push(AnalysisError::at(
            format!("missing `{}`", node.kind()),
            pos.row + 1,
            pos.column,
        ));
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, errors);
    }
}

/// Source text covered by a node.
pub(crate) fn text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Source text of a named field, if present and non-empty.
pub(crate) fn field_text<'s>(node: Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field)
        .map(|n| text(n, source))
        .filter(|t| !t.is_empty())
}

/// 1-indexed line of a node's first byte.
pub(crate) fn line(node: Node) -> usize {
    node.start_position().row + 1
}

/// A comment ending on the line directly above (or on the same line as) a node.
pub(crate) fn adjacent_comment<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    if prev.end_position().row + 1 < node.start_position().row {
        return None;
    }
    Some(prev)
}

/// Strip common leading indentation, trimming blank edge lines.
pub(crate) fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    // The first line carries no indentation of its own (it follows the
    // opening delimiter), so only the rest determine the margin.
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, l) in lines.iter().enumerate() {
        if i == 0 {
            out.push(l.trim());
        } else if l.trim().is_empty() {
            out.push("");
        } else {
            out.push(l.get(margin..).unwrap_or(l.trim_start()).trim_end());
        }
    }

    while out.first().map_or(false, |l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().map_or(false, |l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}
