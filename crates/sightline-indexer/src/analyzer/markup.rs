//! HTML analyzer.

use super::syntax;
use super::{analyze_source, Analyzer, Capability, Extraction};
use crate::model::{FileSummary, SymbolInfo, SymbolKind};
use std::path::Path;
use tree_sitter::{Language, Node};

/// Records identifiable elements: anything with an `id`, and custom elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupAnalyzer;

impl MarkupAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for MarkupAnalyzer {
    fn capability(&self) -> Capability {
        Capability::Markup
    }

    fn parse(&self, path: &Path) -> FileSummary {
        analyze_source(path, |source| extract(path, source))
    }
}

fn extract(path: &Path, source: &str) -> Extraction {
    let language: Language = tree_sitter_html::LANGUAGE.into();
    let tree = match syntax::parse(&language, source) {
        Ok(t) => t,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let mut symbols = Vec::new();
    visit(tree.root_node(), path, source, &mut symbols);

    (symbols, syntax::syntax_errors(&tree))
}

fn visit(node: Node, path: &Path, source: &str, symbols: &mut Vec<SymbolInfo>) {
    if matches!(node.kind(), "element" | "script_element" | "style_element") {
        if let Some(name) = element_symbol_name(node, source) {
            symbols.push(SymbolInfo {
                name,
                kind: SymbolKind::Element,
                path: path.to_path_buf(),
                line: syntax::line(node),
                parent: None,
                doc: comment_before(node, source),
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, path, source, symbols);
    }
}

/// `tag#id` for elements with an id, the bare tag for custom elements.
fn element_symbol_name(element: Node, source: &str) -> Option<String> {
    let mut cursor = element.walk();
    let tag = element
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))?;

    let mut tag_cursor = tag.walk();
    let mut tag_name = None;
    let mut id = None;
    for child in tag.named_children(&mut tag_cursor) {
        match child.kind() {
            "tag_name" => tag_name = Some(syntax::text(child, source).to_lowercase()),
            "attribute" => {
                if let Some((attr, value)) = attribute(child, source) {
                    if attr.eq_ignore_ascii_case("id") && !value.is_empty() {
                        id = Some(value);
                    }
                }
            }
            _ => {}
        }
    }

    let tag_name = tag_name?;
    match id {
        Some(id) => Some(format!("{}#{}", tag_name, id)),
        None if tag_name.contains('-') => Some(tag_name),
        None => None,
    }
}

fn attribute<'s>(attr: Node, source: &'s str) -> Option<(&'s str, String)> {
    let mut cursor = attr.walk();
    let mut name = None;
    let mut value = String::new();
    for child in attr.named_children(&mut cursor) {
        match child.kind() {
            "attribute_name" => name = Some(syntax::text(child, source)),
            "attribute_value" => value = syntax::text(child, source).to_string(),
            "quoted_attribute_value" => {
                value = syntax::text(child, source)
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string()
            }
            _ => {}
        }
    }
    name.map(|n| (n, value.trim().to_string()))
}

fn comment_before(node: Node, source: &str) -> Option<String> {
    let comment = syntax::adjacent_comment(node)?;
    let raw = syntax::text(comment, source);
    let inner = raw
        .strip_prefix("<!--")
        .and_then(|s| s.strip_suffix("-->"))
        .unwrap_or(raw)
        .trim();
    (!inner.is_empty()).then(|| inner.to_string())
}
