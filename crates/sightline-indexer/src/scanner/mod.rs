//! Full scans and incremental reconciliation.
//!
//! The scanner is the only component that traverses the filesystem and
//! decides which paths are in scope. It binds one analyzer per configured
//! extension at construction time.

mod walker;

pub use walker::Walker;

use crate::analyzer::{Analyzer, AnalyzerRegistry, PlainTextAnalyzer};
use crate::change::ChangeBatch;
use crate::config::IndexerConfig;
use crate::filter::{canonical_path, normalize_extension, PathFilter};
use crate::index::SymbolIndex;
use crate::model::{file_modified_at, AnalysisError, FileSummary};
use crate::snapshot::SnapshotStore;
use crate::IndexerError;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Paths touched by a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub updated: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Orchestrates file discovery, filtering and analyzer dispatch.
#[derive(Clone)]
pub struct Scanner {
    filter: Arc<PathFilter>,
    analyzers: Arc<HashMap<String, Arc<dyn Analyzer>>>,
    fallback: Arc<dyn Analyzer>,
    max_file_size: u64,
    respect_gitignore: bool,
    /// Serializes full rebuilds and reconciliation passes
    reconcile_lock: Arc<Mutex<()>>,
}

impl Scanner {
    /// Create a scanner with the default analyzer registry.
    pub fn new(config: &IndexerConfig) -> Result<Self, IndexerError> {
        Self::with_registry(config, &AnalyzerRegistry::new())
    }

    /// Create a scanner binding analyzers from a specific registry.
    pub fn with_registry(
        config: &IndexerConfig,
        registry: &AnalyzerRegistry,
    ) -> Result<Self, IndexerError> {
        let root = validate_root(&config.root)?;
        let filter = PathFilter::from_config(root, config);
        let analyzers = registry.bind(filter.extensions());

        info!(
            root = ?filter.root(),
            extensions = analyzers.len(),
            "Scanner ready"
        );

        Ok(Self {
            filter: Arc::new(filter),
            analyzers: Arc::new(analyzers),
            fallback: Arc::new(PlainTextAnalyzer::new()),
            max_file_size: config.max_file_size,
            respect_gitignore: config.respect_gitignore,
            reconcile_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        self.filter.root()
    }

    /// The effective scope filter, shareable with a watcher.
    pub fn filter(&self) -> Arc<PathFilter> {
        self.filter.clone()
    }

    /// Discover every in-scope file under the root.
    pub fn discover(&self) -> Vec<PathBuf> {
        Walker::new(self.filter.clone(), self.respect_gitignore).walk()
    }

    /// Walk and analyze the whole tree. Does not touch any index.
    pub fn scan(&self) -> Vec<FileSummary> {
        let start = Instant::now();
        info!(path = ?self.root(), "Starting scan");

        let paths = self.discover();
        debug!(count = paths.len(), "Files discovered");

        let summaries: Vec<FileSummary> = paths.iter().map(|p| self.analyze(p)).collect();

        let errors = summaries.iter().filter(|s| s.has_errors()).count();
        info!(
            files = summaries.len(),
            with_errors = errors,
            duration_ms = start.elapsed().as_millis() as u64,
            "Scan complete"
        );

        summaries
    }

    /// Analyze one file with its bound analyzer, honouring the size budget.
    pub fn analyze(&self, path: &Path) -> FileSummary {
        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.len() > self.max_file_size {
                debug!(path = ?path, size = metadata.len(), "Skipping large file");
                return FileSummary::new(path)
                    .with_modified_at(file_modified_at(path))
                    .with_error(AnalysisError::new(format!(
                        "file exceeds size budget ({} > {} bytes)",
                        metadata.len(),
                        self.max_file_size
                    )));
            }
        }

        self.analyzer_for(path).parse(path)
    }

    fn analyzer_for(&self, path: &Path) -> &Arc<dyn Analyzer> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.analyzers.get(&normalize_extension(e)))
            .unwrap_or(&self.fallback)
    }

    /// Scan and replace the index contents, dropping entries for files that
    /// no longer exist.
    pub fn rebuild_index(&self, index: &SymbolIndex) -> ReconcileOutcome {
        let _guard = self.reconcile_lock.lock();

        let before: BTreeSet<PathBuf> = index.get_all().into_iter().map(|s| s.path).collect();
        let summaries = self.scan();
        let updated: BTreeSet<PathBuf> = summaries.iter().map(|s| s.path.clone()).collect();
        index.replace_all(summaries);

        ReconcileOutcome {
            deleted: before.difference(&updated).cloned().collect(),
            updated,
        }
    }

    /// Apply a change batch to the index.
    ///
    /// Removals are applied first and are unconditional for paths under the
    /// root; refreshes only touch files that still exist and are in scope.
    /// The outcome lists only paths whose entry actually changed. Applying the
    /// same batch twice leaves the index unchanged.
    pub fn apply_change_batch(&self, index: &SymbolIndex, batch: &ChangeBatch) -> ReconcileOutcome {
        let _guard = self.reconcile_lock.lock();
        let mut outcome = ReconcileOutcome::default();

        let removals: BTreeSet<PathBuf> = batch
            .paths_to_remove()
            .iter()
            .map(|p| canonical_path(p))
            .filter(|p| self.filter.is_under_root(p))
            .collect();
        for path in removals {
            if index.remove(&path) {
                outcome.deleted.insert(path);
            }
        }

        let refreshes: BTreeSet<PathBuf> = batch
            .paths_to_refresh()
            .iter()
            .map(|p| canonical_path(p))
            .filter(|p| self.filter.is_trackable(p))
            .collect();
        for path in refreshes {
            let summary = self.analyze(&path);
            index.update_file(summary);
            outcome.deleted.remove(&path);
            outcome.updated.insert(path);
        }

        debug!(
            updated = outcome.updated.len(),
            deleted = outcome.deleted.len(),
            "Applied change batch"
        );

        outcome
    }

    /// Load persisted state into the index before the first scan completes.
    pub async fn hydrate_index(&self, index: &SymbolIndex, store: &SnapshotStore) -> usize {
        index.load_snapshot(store).await
    }

    /// Rebuild the index on a blocking worker, then persist it.
    pub async fn scan_and_persist(
        &self,
        index: &Arc<SymbolIndex>,
        store: &SnapshotStore,
    ) -> Result<ReconcileOutcome, IndexerError> {
        let scanner = self.clone();
        let target = index.clone();
        let outcome = tokio::task::spawn_blocking(move || scanner.rebuild_index(&target)).await?;

        index.save_snapshot(store).await?;
        Ok(outcome)
    }
}

/// Check that the root exists and is a directory, returning its canonical form.
fn validate_root(root: &Path) -> Result<PathBuf, IndexerError> {
    let metadata = std::fs::metadata(root).map_err(|e| IndexerError::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(IndexerError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(root.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Capability;
    use crate::change::ChangeEvent;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        (temp_dir, root)
    }

    fn scanner(root: &Path) -> Scanner {
        Scanner::new(&IndexerConfig::for_root(root)).unwrap()
    }

    #[test]
    fn test_rejects_missing_root() {
        let result = Scanner::new(&IndexerConfig::for_root("/definitely/not/a/dir"));
        assert!(matches!(result, Err(IndexerError::InvalidRoot { .. })));
    }

    #[test]
    fn test_rejects_file_root() {
        let (_tmp, root) = project();
        let file = root.join("a.py");
        fs::write(&file, "").unwrap();

        let result = Scanner::new(&IndexerConfig::for_root(&file));
        assert!(matches!(result, Err(IndexerError::InvalidRoot { .. })));
    }

    #[test]
    fn test_scan_filters_tree() {
        let (_tmp, root) = project();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join(".git/hook.py"), "def h(): pass\n").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), "function d() {}\n").unwrap();
        fs::write(root.join("pkg/a.py"), "def a():\n    pass\n").unwrap();

        let summaries = scanner(&root).scan();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].path, root.join("pkg/a.py"));
    }

    #[test]
    fn test_extension_overrides() {
        let (_tmp, root) = project();
        fs::write(root.join("a.py"), "").unwrap();
        fs::write(root.join("notes.TXT"), "hello").unwrap();

        let config = IndexerConfig {
            extensions: vec![".txt".to_string()],
            ..IndexerConfig::for_root(&root)
        };
        let summaries = Scanner::new(&config).unwrap().scan();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].path, root.join("notes.TXT"));
        assert!(summaries[0].symbols.is_empty());
    }

    #[test]
    fn test_oversized_file_gets_error() {
        let (_tmp, root) = project();
        fs::write(root.join("big.py"), "x = 1\n".repeat(100)).unwrap();

        let config = IndexerConfig {
            max_file_size: 16,
            ..IndexerConfig::for_root(&root)
        };
        let summaries = Scanner::new(&config).unwrap().scan();

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].symbols.is_empty());
        assert!(summaries[0].errors[0].message.contains("size budget"));
        assert!(summaries[0].modified_at.is_some());
    }

    #[test]
    fn test_degraded_capability_still_summarizes() {
        let (_tmp, root) = project();
        fs::write(root.join("a.py"), "def f():\n    pass\n").unwrap();

        let registry = AnalyzerRegistry::with_unavailable([Capability::Script]);
        let scanner =
            Scanner::with_registry(&IndexerConfig::for_root(&root), &registry).unwrap();
        let summaries = scanner.scan();

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].symbols.is_empty());
        assert!(summaries[0].errors.is_empty());
        assert!(summaries[0].modified_at.is_some());
    }

    #[test]
    fn test_apply_change_batch_upserts_and_deletes() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let a = root.join("a.py");
        fs::write(&a, "def one():\n    pass\n").unwrap();
        let batch = ChangeBatch::from_events(&[ChangeEvent::created(&a)]);
        let outcome = scanner.apply_change_batch(&index, &batch);

        assert_eq!(outcome.updated, BTreeSet::from([a.clone()]));
        assert_eq!(index.get_file(&a).unwrap().symbols[0].name, "one");

        fs::remove_file(&a).unwrap();
        let batch = ChangeBatch::from_events(&[ChangeEvent::deleted(&a)]);
        let outcome = scanner.apply_change_batch(&index, &batch);

        assert_eq!(outcome.deleted, BTreeSet::from([a.clone()]));
        assert!(index.get_file(&a).is_none());
    }

    #[test]
    fn test_delete_ignores_extension() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let odd = root.join("legacy.unknown");
        index.update_file(FileSummary::new(&odd));

        let batch = ChangeBatch::from_events(&[ChangeEvent::deleted(&odd)]);
        scanner.apply_change_batch(&index, &batch);

        assert!(index.get_file(&odd).is_none());
    }

    #[test]
    fn test_delete_of_unindexed_path_is_not_reported() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let known = root.join("known.py");
        index.update_file(FileSummary::new(&known));

        let batch = ChangeBatch::from_events(&[
            ChangeEvent::deleted(root.join("never_seen.py")),
            ChangeEvent::deleted(&known),
        ]);
        let outcome = scanner.apply_change_batch(&index, &batch);

        assert_eq!(outcome.deleted, BTreeSet::from([known]));
        assert!(outcome.updated.is_empty());
    }

    #[test]
    fn test_apply_skips_out_of_scope_paths() {
        let (_tmp, root) = project();
        let outside = tempdir().unwrap();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        fs::create_dir_all(root.join("node_modules")).unwrap();
        let excluded = root.join("node_modules/x.py");
        let wrong_ext = root.join("notes.md");
        let missing = root.join("missing.py");
        let foreign = outside.path().join("f.py");
        for p in [&excluded, &wrong_ext, &foreign] {
            fs::write(p, "").unwrap();
        }

        let batch = ChangeBatch::from_events(&[
            ChangeEvent::created(&excluded),
            ChangeEvent::modified(&wrong_ext),
            ChangeEvent::created(&missing),
            ChangeEvent::created(&foreign),
            ChangeEvent::deleted(&foreign),
        ]);
        let outcome = scanner.apply_change_batch(&index, &batch);

        assert!(outcome.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let keep = root.join("keep.py");
        let gone = root.join("gone.py");
        fs::write(&keep, "class K:\n    def m(self):\n        pass\n").unwrap();
        index.update_file(FileSummary::new(&gone));

        let batch = ChangeBatch::from_events(&[
            ChangeEvent::modified(&keep),
            ChangeEvent::deleted(&gone),
        ]);

        scanner.apply_change_batch(&index, &batch);
        let once = index.get_all();
        scanner.apply_change_batch(&index, &batch);
        let twice = index.get_all();

        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_direct_batch_move() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let from = root.join("old.py");
        let to = root.join("new.py");
        fs::write(&from, "def f():\n    pass\n").unwrap();
        index.update_file(scanner.analyze(&from));
        fs::rename(&from, &to).unwrap();

        let batch = ChangeBatch::from_events(&[ChangeEvent::moved(&from, Some(to.clone()))]);
        let outcome = scanner.apply_change_batch(&index, &batch);

        assert!(index.get_file(&from).is_none());
        assert_eq!(index.get_file(&to).unwrap().symbols.len(), 1);
        assert_eq!(outcome.deleted, BTreeSet::from([from]));
        assert_eq!(outcome.updated, BTreeSet::from([to]));
    }

    #[test]
    fn test_rebuild_drops_vanished_files() {
        let (_tmp, root) = project();
        let scanner = scanner(&root);
        let index = SymbolIndex::new(root.clone());

        let stale = root.join("stale.py");
        index.update_file(FileSummary::new(&stale));
        fs::write(root.join("live.py"), "def live():\n    pass\n").unwrap();

        let outcome = scanner.rebuild_index(&index);

        assert_eq!(outcome.deleted, BTreeSet::from([stale.clone()]));
        assert!(index.get_file(&stale).is_none());
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_and_persist_then_hydrate() {
        let (_tmp, root) = project();
        fs::write(root.join("a.py"), "def a():\n    pass\n").unwrap();
        let config = IndexerConfig::for_root(&root);
        let scanner = Scanner::new(&config).unwrap();
        let store = SnapshotStore::for_root(root.clone(), &config);

        let index = Arc::new(SymbolIndex::new(root.clone()));
        scanner.scan_and_persist(&index, &store).await.unwrap();
        assert!(store.exists());

        let fresh = SymbolIndex::new(root.clone());
        let loaded = scanner.hydrate_index(&fresh, &store).await;

        assert_eq!(loaded, 1);
        assert_eq!(fresh.get_all(), index.get_all());

        // The cache directory itself is never scanned
        assert_eq!(scanner.scan().len(), 1);
    }
}
