//! Symbol-level data model produced by analyzers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    /// Markup element; only produced by the markup analyzer.
    Element,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Element => "element",
        }
    }
}

/// A code symbol extracted from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol name
    pub name: String,
    /// Kind of symbol
    pub kind: SymbolKind,
    /// Owning file (canonical path)
    pub path: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
    /// Enclosing class/container, set only for methods
    pub parent: Option<String>,
    /// Doc comment or docstring, if present
    pub doc: Option<String>,
}

/// A problem encountered while analyzing a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisError {
    pub message: String,
    /// Line number (1-indexed)
    pub line: Option<usize>,
    /// Column offset (0-indexed)
    pub column: Option<usize>,
}

impl AnalysisError {
    /// Create an error without a source location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create an error anchored at a line/column.
    pub fn at(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

/// Everything the index knows about one file. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Canonical absolute path
    pub path: PathBuf,
    /// Symbols in source order
    pub symbols: Vec<SymbolInfo>,
    /// Analysis problems; may coexist with symbols
    pub errors: Vec<AnalysisError>,
    /// Last modification time of the file when it was analyzed
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileSummary {
    /// Create an empty summary for a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            symbols: Vec::new(),
            errors: Vec::new(),
            modified_at: None,
        }
    }

    /// Attach a modification timestamp.
    pub fn with_modified_at(mut self, modified_at: Option<DateTime<Utc>>) -> Self {
        self.modified_at = modified_at;
        self
    }

    /// Attach an analysis error.
    pub fn with_error(mut self, error: AnalysisError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Find a symbol by exact name.
    pub fn symbol(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

/// Read a file's modification time, if the platform reports one.
pub fn file_modified_at(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
