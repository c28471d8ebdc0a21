//! In-memory symbol index.
//!
//! The flat path → summary map is the only authoritative state. The
//! hierarchical project tree is a read-time projection rebuilt on request.

use crate::model::{FileSummary, SymbolInfo};
use crate::snapshot::SnapshotStore;
use crate::IndexerError;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A node of the derived project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTreeNode {
    /// Display name (last path segment)
    pub name: String,
    /// Absolute path; always the parent's path joined with `name`
    pub path: PathBuf,
    pub is_dir: bool,
    /// Children keyed by name
    pub children: BTreeMap<String, ProjectTreeNode>,
    /// Present only on file nodes
    pub file_summary: Option<FileSummary>,
}

impl ProjectTreeNode {
    fn directory(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            is_dir: true,
            children: BTreeMap::new(),
            file_summary: None,
        }
    }

    /// Return the child directory with this name, creating it if needed.
    /// Returns `None` when `name` is already taken by a file node.
    fn ensure_dir(&mut self, name: &str) -> Option<&mut ProjectTreeNode> {
        let path = self.path.join(name);
        let node = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| ProjectTreeNode::directory(name.to_string(), path));
        node.is_dir.then_some(node)
    }

    /// Look up a descendant by relative path segments.
    pub fn find(&self, relative: &Path) -> Option<&ProjectTreeNode> {
        relative.components().try_fold(self, |node, c| {
            node.children.get(c.as_os_str().to_str()?)
        })
    }

    /// Number of file nodes in this subtree.
    pub fn file_count(&self) -> usize {
        if !self.is_dir {
            return 1;
        }
        self.children.values().map(|c| c.file_count()).sum()
    }
}

/// Counts for status queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub symbols: usize,
    pub errors: usize,
    pub files_with_errors: usize,
}

/// Authoritative store of file summaries for one project root.
///
/// Mutated only from the reconciliation path; readers may observe either
/// the old or the new summary for any single path while an update runs.
pub struct SymbolIndex {
    root: PathBuf,
    files: RwLock<HashMap<PathBuf, FileSummary>>,
}

impl SymbolIndex {
    /// Create an empty index. `root` should be canonical.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upsert many summaries.
    pub fn update(&self, summaries: impl IntoIterator<Item = FileSummary>) {
        let mut files = self.files.write();
        for summary in summaries {
            files.insert(summary.path.clone(), summary);
        }
    }

    /// Upsert one summary, replacing any previous entry for its path.
    pub fn update_file(&self, summary: FileSummary) {
        self.files.write().insert(summary.path.clone(), summary);
    }

    /// Replace the whole contents with the result of a full rebuild.
    pub fn replace_all(&self, summaries: impl IntoIterator<Item = FileSummary>) {
        let fresh: HashMap<PathBuf, FileSummary> = summaries
            .into_iter()
            .map(|s| (s.path.clone(), s))
            .collect();
        *self.files.write() = fresh;
    }

    /// Remove a path. Returns whether an entry existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    pub fn get_file(&self, path: &Path) -> Option<FileSummary> {
        self.files.read().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    /// All summaries, sorted by path.
    pub fn get_all(&self) -> Vec<FileSummary> {
        let mut all: Vec<FileSummary> = self.files.read().values().cloned().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Every symbol of every file, files in path order.
    pub fn iter_symbols(&self) -> Vec<SymbolInfo> {
        self.get_all()
            .into_iter()
            .flat_map(|summary| summary.symbols)
            .collect()
    }

    /// Case-insensitive substring match on symbol names.
    pub fn search(&self, term: &str) -> Vec<SymbolInfo> {
        let needle = term.to_lowercase();
        self.iter_symbols()
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let files = self.files.read();
        files.values().fold(
            IndexStats {
                files: files.len(),
                ..Default::default()
            },
            |mut stats, summary| {
                stats.symbols += summary.symbols.len();
                stats.errors += summary.errors.len();
                if summary.has_errors() {
                    stats.files_with_errors += 1;
                }
                stats
            },
        )
    }

    /// Build the project tree from the current contents.
    pub fn get_tree(&self) -> ProjectTreeNode {
        let name = self
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();
        let mut root = ProjectTreeNode::directory(name, self.root.clone());

        for summary in self.get_all() {
            let Ok(relative) = summary.path.strip_prefix(&self.root) else {
                debug!(path = ?summary.path, "Skipping summary outside root");
                continue;
            };
            let segments: Vec<String> = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
                .collect();
            let Some((file_name, dirs)) = segments.split_last() else {
                continue;
            };

            let mut node = Some(&mut root);
            for dir in dirs {
                node = node.and_then(|n| n.ensure_dir(dir));
            }
            let Some(node) = node else {
                warn!(path = ?summary.path, "Skipping file nested under a file entry");
                continue;
            };
            if node.children.get(file_name).is_some_and(|c| c.is_dir) {
                warn!(path = ?summary.path, "Skipping file entry shadowing a directory");
                continue;
            }
            let path = node.path.join(file_name);
            node.children.insert(
                file_name.clone(),
                ProjectTreeNode {
                    name: file_name.clone(),
                    path,
                    is_dir: false,
                    children: BTreeMap::new(),
                    file_summary: Some(summary),
                },
            );
        }

        root
    }

    /// Load persisted summaries into the index (upsert).
    pub async fn load_snapshot(&self, store: &SnapshotStore) -> usize {
        let summaries = store.load().await;
        let count = summaries.len();
        self.update(summaries);
        info!(files = count, "Hydrated index from snapshot");
        count
    }

    /// Persist the current contents, read once the store's write lock is held.
    pub async fn save_snapshot(&self, store: &SnapshotStore) -> Result<(), IndexerError> {
        store.save_with(|| self.get_all()).await
    }
}
