//! Debounced, per-path coalescing of filesystem change events.
//!
//! Producers (the watcher callback thread) call [`ChangeScheduler::enqueue`];
//! the reconciliation loop calls [`ChangeScheduler::drain`]. The lock is held
//! only while the queue is mutated, never while a batch is collapsed.

use crate::change::{ChangeBatch, ChangeEvent, ChangeEventType};
use crate::filter::{canonical_path, PathFilter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct QueueState {
    events: Vec<ChangeEvent>,
    last_dispatch: Instant,
}

/// Accumulates raw change events and yields collapsed batches.
pub struct ChangeScheduler {
    debounce: Duration,
    filter: Option<Arc<PathFilter>>,
    state: Mutex<QueueState>,
}

impl ChangeScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            filter: None,
            state: Mutex::new(QueueState {
                events: Vec::new(),
                last_dispatch: Instant::now(),
            }),
        }
    }

    /// Only emit a created event for a move destination this filter tracks.
    pub fn with_filter(mut self, filter: Arc<PathFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record an event. Paths are canonicalized before they are queued.
    pub fn enqueue(&self, kind: ChangeEventType, path: impl Into<PathBuf>, dest: Option<PathBuf>) {
        let path = canonical_path(&path.into());
        let dest = dest.map(|d| canonical_path(&d));
        let event = ChangeEvent { kind, path, dest };

        self.state.lock().events.push(event);
    }

    /// Take the pending events as one collapsed batch.
    ///
    /// Without `force`, nothing is returned until the debounce interval has
    /// passed since the previous successful drain. A steady stream of events
    /// is therefore dispatched at most once per interval, never starved.
    pub fn drain(&self, force: bool) -> Option<ChangeBatch> {
        let events = {
            let mut state = self.state.lock();
            if state.events.is_empty() {
                return None;
            }
            if !force && state.last_dispatch.elapsed() < self.debounce {
                return None;
            }
            state.last_dispatch = Instant::now();
            std::mem::take(&mut state.events)
        };

        let raw = events.len();
        let batch = self.collapse(events);
        debug!(raw, collapsed = batch.len(), forced = force, "Drained change queue");
        Some(batch)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Drop every pending event.
    pub fn clear(&self) {
        self.state.lock().events.clear();
    }

    fn dest_trackable(&self, dest: &std::path::Path) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |f| f.is_trackable_removal(dest))
    }

    /// Reduce events to one terminal event per path, in enqueue order.
    fn collapse(&self, events: Vec<ChangeEvent>) -> ChangeBatch {
        let mut terminal: HashMap<PathBuf, ChangeEventType> = HashMap::new();

        for event in events {
            match event.kind {
                ChangeEventType::Moved => {
                    terminal.insert(event.path, ChangeEventType::Deleted);
                    if let Some(dest) = event.dest.filter(|d| self.dest_trackable(d)) {
                        terminal.insert(dest, ChangeEventType::Created);
                    }
                }
                ChangeEventType::Created | ChangeEventType::Deleted => {
                    terminal.insert(event.path, event.kind);
                }
                ChangeEventType::Modified => {
                    let state = terminal
                        .entry(event.path)
                        .or_insert(ChangeEventType::Modified);
                    if *state != ChangeEventType::Created {
                        *state = ChangeEventType::Modified;
                    }
                }
            }
        }

        let mut batch = ChangeBatch::default();
        for (path, kind) in terminal {
            match kind {
                ChangeEventType::Created => {
                    batch.created.insert(path);
                }
                ChangeEventType::Modified => {
                    batch.modified.insert(path);
                }
                ChangeEventType::Deleted => {
                    batch.deleted.insert(path);
                }
                ChangeEventType::Moved => {}
            }
        }
        batch
    }
}
