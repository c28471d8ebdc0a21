//! Path canonicalization and scope filtering shared by the scanner and watcher.

use crate::config::IndexerConfig;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Normalize an extension: lowercase, without a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Resolve a path to its canonical form.
///
/// Paths that no longer exist (deleted files) are resolved through their
/// deepest existing ancestor so they compare equal to the path recorded
/// while the file was still present.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(mut resolved) = parent.canonicalize() {
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        current = parent;
    }

    absolute
}

/// Decides which paths are in scope for a project root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    exclude_dirs: HashSet<String>,
    extensions: HashSet<String>,
}

impl PathFilter {
    /// Create a filter. `root` should already be canonical.
    pub fn new<D, E>(root: PathBuf, exclude_dirs: D, extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            root,
            exclude_dirs: exclude_dirs.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Build the effective filter for a canonical root from configuration.
    pub fn from_config(root: PathBuf, config: &IndexerConfig) -> Self {
        Self::new(
            root,
            config.effective_exclude_dirs(),
            config.effective_extensions(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn is_under_root(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Whether a directory with this name is pruned from traversal.
    pub fn is_excluded_dir_name(&self, name: &str) -> bool {
        name.starts_with('.') || self.exclude_dirs.contains(name)
    }

    /// Whether any directory between the root and the path is excluded.
    pub fn in_excluded_dir(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        let Some(parent) = relative.parent() else {
            return false;
        };
        parent.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .map(|n| self.is_excluded_dir_name(n))
                .unwrap_or(false),
            _ => false,
        })
    }

    /// Extension check on the path string alone.
    pub fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&normalize_extension(e)))
            .unwrap_or(false)
    }

    /// A path that must exist as a regular file to be tracked.
    pub fn is_trackable(&self, path: &Path) -> bool {
        self.is_trackable_removal(path) && path.is_file()
    }

    /// A path that may already be gone: no existence check.
    pub fn is_trackable_removal(&self, path: &Path) -> bool {
        self.is_under_root(path) && !self.in_excluded_dir(path) && self.has_supported_extension(path)
    }
}
