//! Python analyzer.

use super::syntax::{self, dedent};
use super::{analyze_source, Analyzer, Capability, Extraction};
use crate::model::{FileSummary, SymbolInfo, SymbolKind};
use std::path::Path;
use tree_sitter::{Language, Node};

/// Extracts module-level functions, classes and their methods from Python.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for ScriptAnalyzer {
    fn capability(&self) -> Capability {
        Capability::Script
    }

    fn parse(&self, path: &Path) -> FileSummary {
        analyze_source(path, |source| extract(path, source))
    }
}

fn extract(path: &Path, source: &str) -> Extraction {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let tree = match syntax::parse(&language, source) {
        Ok(t) => t,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let mut symbols = Vec::new();
    visit_block(tree.root_node(), None, path, source, &mut symbols);

    (symbols, syntax::syntax_errors(&tree))
}

/// Visit the statements of a module or class body.
fn visit_block(
    block: Node,
    class: Option<&str>,
    path: &Path,
    source: &str,
    symbols: &mut Vec<SymbolInfo>,
) {
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        let def = if child.kind() == "decorated_definition" {
            match child.child_by_field_name("definition") {
                Some(d) => d,
                None => continue,
            }
        } else {
            child
        };

        match def.kind() {
            "function_definition" => {
                let Some(name) = syntax::field_text(def, "name", source) else {
                    continue;
                };
                let (kind, parent) = match class {
                    Some(c) => (SymbolKind::Method, Some(c.to_string())),
                    None => (SymbolKind::Function, None),
                };
                symbols.push(SymbolInfo {
                    name: name.to_string(),
                    kind,
                    path: path.to_path_buf(),
                    line: syntax::line(def),
                    parent,
                    doc: docstring(def, source),
                });
            }
            "class_definition" => {
                let Some(name) = syntax::field_text(def, "name", source) else {
                    continue;
                };
                symbols.push(SymbolInfo {
                    name: name.to_string(),
                    kind: SymbolKind::Class,
                    path: path.to_path_buf(),
                    line: syntax::line(def),
                    parent: None,
                    doc: docstring(def, source),
                });
                if let Some(body) = def.child_by_field_name("body") {
                    visit_block(body, Some(name), path, source, symbols);
                }
            }
            _ => {}
        }
    }
}

/// The docstring of a function or class: a string literal as first statement.
fn docstring(def: Node, source: &str) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;

    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }

    let doc = dedent(strip_string_literal(syntax::text(literal, source)));
    (!doc.is_empty()).then_some(doc)
}

/// Remove prefix letters and quotes from a Python string literal.
fn strip_string_literal(raw: &str) -> &str {
    let unprefixed = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if unprefixed.len() >= 2 * quote.len()
            && unprefixed.starts_with(quote)
            && unprefixed.ends_with(quote)
        {
            return &unprefixed[quote.len()..unprefixed.len() - quote.len()];
        }
    }
    unprefixed
}
