//! Per-language analyzers.
//!
//! Each analyzer turns one file into a [`FileSummary`]. Analyzers are
//! stateless and never fail: unreadable files and syntax problems are
//! reported as [`AnalysisError`]s on the returned summary so that a single
//! bad file cannot abort a scan.

#[cfg(feature = "html")]
mod markup;
mod plaintext;
mod registry;
#[cfg(feature = "python")]
mod script;
#[cfg(any(
    feature = "python",
    feature = "javascript",
    feature = "typescript",
    feature = "html"
))]
mod syntax;
#[cfg(any(feature = "javascript", feature = "typescript"))]
mod webscript;

#[cfg(feature = "html")]
pub use markup::MarkupAnalyzer;
pub use plaintext::PlainTextAnalyzer;
pub use registry::{AnalyzerRegistry, CapabilityStatus};
#[cfg(feature = "python")]
pub use script::ScriptAnalyzer;
#[cfg(feature = "typescript")]
pub use webscript::{TypedWebScriptAnalyzer, TypeScriptDialect};
#[cfg(feature = "javascript")]
pub use webscript::WebScriptAnalyzer;

use crate::model::{file_modified_at, AnalysisError, FileSummary, SymbolInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named unit of per-language analysis support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Python sources
    Script,
    /// JavaScript sources
    WebScript,
    /// TypeScript sources, plain and TSX
    TypedWebScript,
    /// HTML documents
    Markup,
    /// Fallback that records the file without symbols
    PlainText,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Script,
        Capability::WebScript,
        Capability::TypedWebScript,
        Capability::Markup,
        Capability::PlainText,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Script => "script",
            Capability::WebScript => "web_script",
            Capability::TypedWebScript => "typed_web_script",
            Capability::Markup => "markup",
            Capability::PlainText => "plain_text",
        }
    }

    /// Cargo feature providing the parsing backend, if one is needed.
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            Capability::Script => Some("python"),
            Capability::WebScript => Some("javascript"),
            Capability::TypedWebScript => Some("typescript"),
            Capability::Markup => Some("html"),
            Capability::PlainText => None,
        }
    }

    /// Whether the parsing backend was compiled in.
    pub fn backend_compiled(&self) -> bool {
        match self {
            Capability::Script => cfg!(feature = "python"),
            Capability::WebScript => cfg!(feature = "javascript"),
            Capability::TypedWebScript => cfg!(feature = "typescript"),
            Capability::Markup => cfg!(feature = "html"),
            Capability::PlainText => true,
        }
    }

    /// Default capability for a normalized extension.
    pub fn for_extension(ext: &str) -> Capability {
        match ext {
            "py" | "pyi" | "pyw" => Capability::Script,
            "js" | "jsx" | "mjs" | "cjs" => Capability::WebScript,
            "ts" | "mts" | "cts" | "tsx" => Capability::TypedWebScript,
            "html" | "htm" | "xhtml" => Capability::Markup,
            _ => Capability::PlainText,
        }
    }
}

/// A stateless source analyzer.
pub trait Analyzer: Send + Sync {
    /// The capability this analyzer implements.
    fn capability(&self) -> Capability;

    /// Analyze a file. Must not panic or fail on I/O or syntax problems.
    fn parse(&self, path: &Path) -> FileSummary;
}

/// Symbols and problems extracted from a source text.
pub(crate) type Extraction = (Vec<SymbolInfo>, Vec<AnalysisError>);

/// Read a file as UTF-8 and run an extractor over it.
///
/// Read and decode failures become an [`AnalysisError`] on an otherwise
/// empty summary.
pub(crate) fn analyze_source<F>(path: &Path, extract: F) -> FileSummary
where
    F: FnOnce(&str) -> Extraction,
{
    let summary = FileSummary::new(path).with_modified_at(file_modified_at(path));

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(path = ?path, error = %e, "Failed to read file");
            return summary.with_error(AnalysisError::new(format!("unable to read file: {}", e)));
        }
    };

    let source = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            return summary.with_error(AnalysisError::new(format!(
                "unable to decode file as UTF-8: {}",
                e.utf8_error()
            )));
        }
    };

    let (symbols, errors) = extract(&source);
    FileSummary {
        symbols,
        errors,
        ..summary
    }
}
