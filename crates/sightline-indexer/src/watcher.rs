//! File system watcher feeding the change scheduler.
//!
//! Uses inotify on Linux and FSEvents on macOS through `notify`. The
//! debouncer only stitches rename pairs together with a short latency; the
//! debounce interval is enforced by the [`ChangeScheduler`].

use crate::change::{ChangeEvent, ChangeEventType};
use crate::filter::{canonical_path, PathFilter};
use crate::scheduler::ChangeScheduler;
use crate::IndexerError;
use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Latency used to pair rename halves before events reach the scheduler.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// Watches a project root and enqueues in-scope changes.
pub struct FileWatcher {
    filter: Arc<PathFilter>,
    scheduler: Arc<ChangeScheduler>,
    latency: Duration,
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
}

impl FileWatcher {
    pub fn new(filter: Arc<PathFilter>, scheduler: Arc<ChangeScheduler>) -> Self {
        Self {
            filter,
            scheduler,
            latency: DEFAULT_LATENCY,
            debouncer: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn is_running(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Start watching the filter's root recursively. Starting twice is a no-op.
    pub fn start(&mut self) -> Result<(), IndexerError> {
        if self.debouncer.is_some() {
            return Ok(());
        }

        let root = self.filter.root().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::NotFound(root));
        }

        let filter = self.filter.clone();
        let scheduler = self.scheduler.clone();

        let mut debouncer = new_debouncer(
            self.latency,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        handle_event(&event.event, &filter, &scheduler);
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Watcher error");
                    }
                }
            },
        )?;

        debouncer.watch(&root, RecursiveMode::Recursive)?;

        info!(path = ?root, "Started watching");
        self.debouncer = Some(debouncer);
        Ok(())
    }

    /// Stop delivering events. Pending scheduler events are kept.
    pub fn stop(&mut self) {
        if let Some(debouncer) = self.debouncer.take() {
            debouncer.stop();
            info!(path = ?self.filter.root(), "Stopped watching");
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_event(event: &Event, filter: &PathFilter, scheduler: &ChangeScheduler) {
    let Some(change) = convert_event(event) else {
        return;
    };
    let Some(change) = admit(change, filter) else {
        return;
    };

    debug!(path = ?change.path, kind = ?change.kind, "File change detected");
    scheduler.enqueue(change.kind, change.path, change.dest);
}

/// Convert a notify event into a typed change, ignoring directories.
fn convert_event(event: &Event) -> Option<ChangeEvent> {
    let path = event.paths.first()?.clone();

    let change = match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let dest = event.paths.get(1).cloned();
            ChangeEvent::moved(path, dest)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeEvent::deleted(path),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeEvent::created(path),
        EventKind::Modify(ModifyKind::Name(_)) => {
            if path.exists() {
                ChangeEvent::created(path)
            } else {
                ChangeEvent::deleted(path)
            }
        }
        EventKind::Create(notify::event::CreateKind::Folder) => return None,
        EventKind::Create(_) => ChangeEvent::created(path),
        EventKind::Modify(_) => ChangeEvent::modified(path),
        EventKind::Remove(RemoveKind::Folder) => return None,
        EventKind::Remove(_) => ChangeEvent::deleted(path),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => return None,
    };

    // Only care about files, not directories
    if change.kind != ChangeEventType::Moved && change.path.is_dir() {
        return None;
    }

    Some(change)
}

/// Canonicalize and scope-check a change against the filter.
fn admit(change: ChangeEvent, filter: &PathFilter) -> Option<ChangeEvent> {
    let path = canonical_path(&change.path);

    match change.kind {
        ChangeEventType::Created | ChangeEventType::Modified => {
            filter.is_trackable(&path).then(|| ChangeEvent { path, ..change })
        }
        ChangeEventType::Deleted => filter
            .is_trackable_removal(&path)
            .then(|| ChangeEvent::deleted(path)),
        ChangeEventType::Moved => {
            let source_ok = filter.is_trackable_removal(&path);
            let dest = change
                .dest
                .as_deref()
                .map(canonical_path)
                .filter(|d| filter.is_trackable(d));

            match (source_ok, dest) {
                (true, Some(dest)) => Some(ChangeEvent::moved(path, Some(dest))),
                (true, None) => Some(ChangeEvent::deleted(path)),
                (false, Some(dest)) => Some(ChangeEvent::created(dest)),
                (false, None) => None,
            }
        }
    }
}
