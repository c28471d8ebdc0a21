//! Indexer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Directories never descended into, in addition to any dot-prefixed directory.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    "dist",
    "build",
    "target",
];

/// Extensions indexed when the caller does not supply its own set.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "mts", "cts", "tsx", "html", "htm",
];

/// Settings for one project root, supplied by the caller at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Project root to index
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Extra directory names to exclude (unioned with the defaults)
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Extensions to index; replaces the defaults when non-empty
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Minimum time between non-forced drains
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Files larger than this are recorded with an error instead of parsed
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Honour .gitignore files during full scans
    #[serde(default)]
    pub respect_gitignore: bool,

    /// Name of the project-local cache directory
    #[serde(default = "default_cache_dir_name")]
    pub cache_dir_name: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_cache_dir_name() -> String {
    ".sightline".to_string()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_dirs: Vec::new(),
            extensions: Vec::new(),
            debounce_ms: default_debounce_ms(),
            max_file_size: default_max_file_size(),
            respect_gitignore: false,
            cache_dir_name: default_cache_dir_name(),
        }
    }
}

impl IndexerConfig {
    /// Create a configuration for a root with default settings.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Effective exclude set: defaults plus overrides.
    pub fn effective_exclude_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect();
        dirs.push(self.cache_dir_name.clone());
        for dir in &self.exclude_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    /// Effective extension set, normalized (lowercase, no leading dot).
    pub fn effective_extensions(&self) -> Vec<String> {
        let source: Vec<&str> = if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.to_vec()
        } else {
            self.extensions.iter().map(String::as_str).collect()
        };
        let mut exts: Vec<String> = Vec::with_capacity(source.len());
        for ext in source {
            let ext = crate::filter::normalize_extension(ext);
            if !ext.is_empty() && !exts.contains(&ext) {
                exts.push(ext);
            }
        }
        exts
    }
}
