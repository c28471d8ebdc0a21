//! JavaScript and TypeScript analyzers.
//!
//! Both grammars share node names for the constructs we index, so a single
//! extraction pass serves plain JavaScript, TypeScript and TSX.

use super::syntax;
use super::{analyze_source, Analyzer, Capability, Extraction};
use crate::model::{FileSummary, SymbolInfo, SymbolKind};
use std::path::Path;
use tree_sitter::{Language, Node};

/// Declarator values that make a binding count as a function.
const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Extracts functions, classes and methods from JavaScript.
#[cfg(feature = "javascript")]
#[derive(Debug, Default, Clone, Copy)]
pub struct WebScriptAnalyzer;

#[cfg(feature = "javascript")]
impl WebScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "javascript")]
impl Analyzer for WebScriptAnalyzer {
    fn capability(&self) -> Capability {
        Capability::WebScript
    }

    fn parse(&self, path: &Path) -> FileSummary {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        analyze_source(path, |source| extract(&language, path, source))
    }
}

/// TypeScript grammar flavour.
#[cfg(feature = "typescript")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeScriptDialect {
    /// `.ts`, `.mts`, `.cts`
    Plain,
    /// `.tsx`
    Jsx,
}

/// Extracts functions, classes and methods from TypeScript.
#[cfg(feature = "typescript")]
#[derive(Debug, Clone, Copy)]
pub struct TypedWebScriptAnalyzer {
    dialect: TypeScriptDialect,
}

#[cfg(feature = "typescript")]
impl TypedWebScriptAnalyzer {
    pub fn new(dialect: TypeScriptDialect) -> Self {
        Self { dialect }
    }

    /// Pick the dialect from a normalized extension.
    pub fn for_extension(ext: &str) -> Self {
        match ext {
            "tsx" => Self::new(TypeScriptDialect::Jsx),
            _ => Self::new(TypeScriptDialect::Plain),
        }
    }

    pub fn dialect(&self) -> TypeScriptDialect {
        self.dialect
    }
}

#[cfg(feature = "typescript")]
impl Analyzer for TypedWebScriptAnalyzer {
    fn capability(&self) -> Capability {
        Capability::TypedWebScript
    }

    fn parse(&self, path: &Path) -> FileSummary {
        let language: Language = match self.dialect {
            TypeScriptDialect::Plain => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            TypeScriptDialect::Jsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        };
        analyze_source(path, |source| extract(&language, path, source))
    }
}

fn extract(language: &Language, path: &Path, source: &str) -> Extraction {
    let tree = match syntax::parse(language, source) {
        Ok(t) => t,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let mut ctx = Context {
        path,
        source,
        symbols: Vec::new(),
    };
    let root = tree.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        ctx.visit_statement(stmt, stmt);
    }

    (ctx.symbols, syntax::syntax_errors(&tree))
}

struct Context<'a> {
    path: &'a Path,
    source: &'a str,
    symbols: Vec<SymbolInfo>,
}

impl Context<'_> {
    /// `anchor` is the node a doc comment would precede (the export wrapper
    /// for exported declarations).
    fn visit_statement(&mut self, stmt: Node, anchor: Node) {
        match stmt.kind() {
            "export_statement" => {
                if let Some(decl) = stmt.child_by_field_name("declaration") {
                    self.visit_statement(decl, anchor);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = syntax::field_text(stmt, "name", self.source) {
                    self.push(name, SymbolKind::Function, stmt, None, anchor);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = syntax::field_text(stmt, "name", self.source) {
                    self.push(name, SymbolKind::Class, stmt, None, anchor);
                    self.visit_class_body(stmt, name);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = stmt.walk();
                for declarator in stmt.named_children(&mut cursor) {
                    if declarator.kind() == "variable_declarator" {
                        self.visit_declarator(declarator, anchor);
                    }
                }
            }
            _ => {}
        }
    }

    /// `const f = () => ...` and `const C = class { ... }`.
    fn visit_declarator(&mut self, declarator: Node, anchor: Node) {
        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            return;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            return;
        };
        let name = syntax::text(name_node, self.source);

        if FUNCTION_VALUES.contains(&value.kind()) {
            self.push(name, SymbolKind::Function, declarator, None, anchor);
        } else if value.kind() == "class" {
            self.push(name, SymbolKind::Class, declarator, None, anchor);
            self.visit_class_body(value, name);
        }
    }

    fn visit_class_body(&mut self, class: Node, class_name: &str) {
        let Some(body) = class.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let name = match member.kind() {
                "method_definition" => syntax::field_text(member, "name", self.source),
                // JS names the field `property`, TS names it `name`
                "field_definition" | "public_field_definition" => member
                    .child_by_field_name("value")
                    .filter(|v| FUNCTION_VALUES.contains(&v.kind()))
                    .and_then(|_| {
                        syntax::field_text(member, "property", self.source)
                            .or_else(|| syntax::field_text(member, "name", self.source))
                    }),
                _ => None,
            };
            if let Some(name) = name {
                self.push(
                    name,
                    SymbolKind::Method,
                    member,
                    Some(class_name.to_string()),
                    member,
                );
            }
        }
    }

    fn push(
        &mut self,
        name: &str,
        kind: SymbolKind,
        node: Node,
        parent: Option<String>,
        anchor: Node,
    ) {
        self.symbols.push(SymbolInfo {
            name: name.to_string(),
            kind,
            path: self.path.to_path_buf(),
            line: syntax::line(node),
            parent,
            doc: doc_comment(anchor, self.source),
        });
    }
}

/// A `/** ... */` block comment directly above a node.
fn doc_comment(anchor: Node, source: &str) -> Option<String> {
    let comment = syntax::adjacent_comment(anchor)?;
    clean_block_comment(syntax::text(comment, source))
}

fn clean_block_comment(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix("/**")?.strip_suffix("*/")?;
    let lines: Vec<&str> = inner
        .lines()
        .map(|l| {
            let l = l.trim();
            l.strip_prefix('*').map(str::trim).unwrap_or(l)
        })
        .collect();

    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}
