//! Fallback analyzer for files without an available parser.

use super::{Analyzer, Capability};
use crate::model::{file_modified_at, FileSummary};
use std::path::Path;

/// Records the file and its timestamp without reading it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextAnalyzer;

impl PlainTextAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for PlainTextAnalyzer {
    fn capability(&self) -> Capability {
        Capability::PlainText
    }

    fn parse(&self, path: &Path) -> FileSummary {
        FileSummary::new(path).with_modified_at(file_modified_at(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plaintext_keeps_timestamp() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, "def not_python(): pass").unwrap();

        let summary = PlainTextAnalyzer::new().parse(&path);

        assert_eq!(summary.path, path);
        assert!(summary.symbols.is_empty());
        assert!(summary.errors.is_empty());
        assert!(summary.modified_at.is_some());
    }

    #[test]
    fn test_plaintext_missing_file_is_not_an_error() {
        let summary = PlainTextAnalyzer::new().parse(Path::new("/gone/notes.txt"));
        assert!(summary.errors.is_empty());
        assert!(summary.modified_at.is_none());
    }
}
