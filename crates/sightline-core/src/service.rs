//! Per-root index service.
//!
//! Owns the index, scanner, scheduler, watcher and snapshot store for one
//! project root and drives them: hydrate from the snapshot, full scan,
//! start watching, then periodically drain and reconcile.

use crate::{CoreError, DaemonConfig};
use parking_lot::Mutex;
use serde::Serialize;
use sightline_indexer::{
    AnalyzerRegistry, CapabilityStatus, ChangeScheduler, FileWatcher, IndexStats,
    ReconcileOutcome, Scanner, SnapshotStore, SymbolIndex,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capacity of the update broadcast channel.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Paths changed by one reconciliation pass or full rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexUpdate {
    pub updated: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub full_rebuild: bool,
}

impl IndexUpdate {
    fn from_outcome(outcome: &ReconcileOutcome, full_rebuild: bool) -> Self {
        Self {
            updated: outcome.updated.iter().cloned().collect(),
            deleted: outcome.deleted.iter().cloned().collect(),
            full_rebuild,
        }
    }
}

/// Live index for a single project root.
pub struct IndexService {
    config: DaemonConfig,
    scanner: Scanner,
    index: Arc<SymbolIndex>,
    scheduler: Arc<ChangeScheduler>,
    store: SnapshotStore,
    capabilities: Vec<CapabilityStatus>,
    watcher: Mutex<Option<FileWatcher>>,
    updates: broadcast::Sender<IndexUpdate>,
}

impl IndexService {
    /// Create a service with the default analyzer registry.
    pub fn new(config: DaemonConfig) -> Result<Self, CoreError> {
        Self::with_registry(config, &AnalyzerRegistry::new())
    }

    /// Create a service binding analyzers from a specific registry.
    pub fn with_registry(
        config: DaemonConfig,
        registry: &AnalyzerRegistry,
    ) -> Result<Self, CoreError> {
        let scanner = Scanner::with_registry(&config.indexer, registry)?;
        let root = scanner.root().to_path_buf();

        let capabilities = registry.capability_report(scanner.filter().extensions());
        for status in capabilities.iter().filter(|s| !s.available) {
            warn!(
                capability = status.capability.name(),
                reason = status.reason.as_deref().unwrap_or("unknown"),
                extensions = ?status.fallback_extensions,
                "Capability degraded"
            );
        }

        let scheduler = ChangeScheduler::new(config.indexer.debounce()).with_filter(scanner.filter());
        let store = SnapshotStore::for_root(root.clone(), &config.indexer);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Ok(Self {
            index: Arc::new(SymbolIndex::new(root)),
            scheduler: Arc::new(scheduler),
            scanner,
            store,
            capabilities,
            watcher: Mutex::new(None),
            updates,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn index(&self) -> Arc<SymbolIndex> {
        self.index.clone()
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn scheduler(&self) -> Arc<ChangeScheduler> {
        self.scheduler.clone()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Per-capability backend availability for the configured extensions.
    pub fn capability_report(&self) -> &[CapabilityStatus] {
        &self.capabilities
    }

    /// Receive an [`IndexUpdate`] after every non-empty reconciliation.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexUpdate> {
        self.updates.subscribe()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().as_ref().is_some_and(FileWatcher::is_running)
    }

    /// Load the persisted snapshot into the index.
    pub async fn hydrate(&self) -> usize {
        self.scanner.hydrate_index(&self.index, &self.store).await
    }

    /// Rebuild the whole index and persist it.
    pub async fn full_scan(&self) -> Result<ReconcileOutcome, CoreError> {
        let start = Instant::now();
        let outcome = self.scanner.scan_and_persist(&self.index, &self.store).await?;

        info!(
            files = self.index.len(),
            removed = outcome.deleted.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Full scan complete"
        );

        self.publish(&outcome, true);
        Ok(outcome)
    }

    /// Start the filesystem watcher. Calling it again is a no-op.
    pub fn start_watching(&self) -> Result<(), CoreError> {
        let mut slot = self.watcher.lock();
        let watcher = slot.get_or_insert_with(|| {
            FileWatcher::new(self.scanner.filter(), self.scheduler.clone())
        });
        watcher.start()?;
        Ok(())
    }

    pub fn stop_watching(&self) {
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.stop();
        }
    }

    /// Drain the scheduler and apply the batch on a blocking worker.
    ///
    /// Returns `None` when there was nothing to do.
    pub async fn reconcile_pending(
        &self,
        force: bool,
    ) -> Result<Option<ReconcileOutcome>, CoreError> {
        let Some(batch) = self.scheduler.drain(force) else {
            return Ok(None);
        };
        if batch.is_empty() {
            debug!("Drained batch was empty");
            return Ok(None);
        }

        let scanner = self.scanner.clone();
        let index = self.index.clone();
        let outcome =
            tokio::task::spawn_blocking(move || scanner.apply_change_batch(&index, &batch)).await?;

        if outcome.is_empty() {
            return Ok(None);
        }

        self.index.save_snapshot(&self.store).await?;
        info!(
            updated = outcome.updated.len(),
            deleted = outcome.deleted.len(),
            "Index reconciled"
        );

        self.publish(&outcome, false);
        Ok(Some(outcome))
    }

    /// Hydrate, scan and persist once, without watching.
    pub async fn run_once(&self) -> Result<IndexStats, CoreError> {
        let hydrated = self.hydrate().await;
        debug!(files = hydrated, "Hydrated before scan");
        self.full_scan().await?;
        Ok(self.stats())
    }

    /// Run until `shutdown` resolves.
    ///
    /// The index is hydrated and rescanned first; when watching is enabled,
    /// pending changes are then reconciled every poll interval.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), CoreError>
    where
        F: Future<Output = ()>,
    {
        self.run_once().await?;

        if self.config.watch {
            self.start_watching()?;
        } else {
            info!("Watching disabled");
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile_pending(true).await {
                        warn!(error = %e, "Reconciliation failed");
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// Stop watching and flush any pending changes to the snapshot.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.stop_watching();
        self.reconcile_pending(true).await?;
        self.index.save_snapshot(&self.store).await?;
        info!(root = ?self.root(), "Index service stopped");
        Ok(())
    }

    fn publish(&self, outcome: &ReconcileOutcome, full_rebuild: bool) {
        if outcome.is_empty() && !full_rebuild {
            return;
        }
        // No subscribers is fine
        let _ = self.updates.send(IndexUpdate::from_outcome(outcome, full_rebuild));
    }
}

impl Drop for IndexService {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_indexer::{Capability, ChangeEventType, IndexerConfig};
    use std::fs;
    use tempfile::tempdir;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.py"), "def main():\n    pass\n").unwrap();
        fs::write(root.join("src/ui.ts"), "export class View {\n  draw() {}\n}\n").unwrap();
        (temp_dir, root)
    }

    fn config(root: &Path) -> DaemonConfig {
        DaemonConfig {
            indexer: IndexerConfig::for_root(root),
            watch: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_once_scans_and_persists() {
        let (_tmp, root) = project();
        let service = IndexService::new(config(&root)).unwrap();

        let stats = service.run_once().await.unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.symbols, 3);
        assert!(service.store().exists());
        assert!(!service.is_watching());
    }

    #[tokio::test]
    async fn test_invalid_root_is_rejected() {
        let result = IndexService::new(config(Path::new("/no/such/root")));
        assert!(matches!(result, Err(CoreError::Indexer(_))));
    }

    #[tokio::test]
    async fn test_reconcile_publishes_update() {
        let (_tmp, root) = project();
        let service = IndexService::new(config(&root)).unwrap();
        service.run_once().await.unwrap();
        let mut updates = service.subscribe();

        let added = root.join("src/extra.py");
        fs::write(&added, "class Extra:\n    pass\n").unwrap();
        fs::remove_file(root.join("src/ui.ts")).unwrap();
        let scheduler = service.scheduler();
        scheduler.enqueue(ChangeEventType::Created, &added, None);
        scheduler.enqueue(ChangeEventType::Deleted, root.join("src/ui.ts"), None);

        let outcome = service.reconcile_pending(true).await.unwrap().unwrap();
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.deleted.len(), 1);

        let update = updates.recv().await.unwrap();
        assert_eq!(update.updated, vec![added.clone()]);
        assert_eq!(update.deleted, vec![root.join("src/ui.ts")]);
        assert!(!update.full_rebuild);

        // Nothing pending afterwards
        assert!(service.reconcile_pending(true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_batch_is_noop() {
        let (_tmp, root) = project();
        let service = IndexService::new(config(&root)).unwrap();
        service.run_once().await.unwrap();

        let scheduler = service.scheduler();
        let ghost = root.join("src/ghost.py");
        scheduler.enqueue(ChangeEventType::Created, &ghost, None);
        scheduler.enqueue(ChangeEventType::Deleted, &ghost, None);

        let mut updates = service.subscribe();
        let saved_at = fs::metadata(service.store().path()).unwrap().modified().unwrap();

        assert!(service.reconcile_pending(true).await.unwrap().is_none());
        assert_eq!(service.stats().files, 2);
        assert!(updates.try_recv().is_err());
        assert_eq!(
            fs::metadata(service.store().path()).unwrap().modified().unwrap(),
            saved_at
        );
    }

    #[tokio::test]
    async fn test_capability_report_marks_degraded() {
        let (_tmp, root) = project();
        let registry = AnalyzerRegistry::with_unavailable([Capability::Script]);
        let service = IndexService::with_registry(config(&root), &registry).unwrap();

        let script = service
            .capability_report()
            .iter()
            .find(|s| s.capability == Capability::Script)
            .unwrap();
        assert!(!script.available);
        assert!(script.fallback_extensions.contains(&"py".to_string()));

        let stats = service.run_once().await.unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_tmp, root) = project();
        let service = IndexService::new(config(&root)).unwrap();

        service.run(async {}).await.unwrap();

        assert_eq!(service.stats().files, 2);
        assert!(service.store().exists());
    }
}
