//! Filesystem change events and batches.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// File change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEventType {
    /// File was created
    Created,
    /// File was modified
    Modified,
    /// File was deleted
    Deleted,
    /// File was moved; the event carries a destination
    Moved,
}

/// A single filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeEventType,
    /// Path of the changed file (source path for moves)
    pub path: PathBuf,
    /// Destination for moves; `None` when the destination is not tracked
    pub dest: Option<PathBuf>,
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeEventType::Created, path)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeEventType::Modified, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeEventType::Deleted, path)
    }

    pub fn moved(from: impl Into<PathBuf>, to: Option<PathBuf>) -> Self {
        Self {
            kind: ChangeEventType::Moved,
            path: from.into(),
            dest: to,
        }
    }

    fn new(kind: ChangeEventType, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            dest: None,
        }
    }
}

/// A set of changes to reconcile against the index.
///
/// Batches produced by the scheduler never populate `moved`: moves are
/// expanded into a delete plus a create before batching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub created: BTreeSet<PathBuf>,
    pub modified: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
    pub moved: Vec<(PathBuf, PathBuf)>,
}

impl ChangeBatch {
    /// Build a batch directly from typed events, keeping moves intact.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ChangeEvent>) -> Self {
        let mut batch = Self::default();
        for event in events {
            batch.push(event);
        }
        batch
    }

    fn push(&mut self, event: &ChangeEvent) {
        match event.kind {
            ChangeEventType::Created => {
                self.created.insert(event.path.clone());
            }
            ChangeEventType::Modified => {
                self.modified.insert(event.path.clone());
            }
            ChangeEventType::Deleted => {
                self.deleted.insert(event.path.clone());
            }
            ChangeEventType::Moved => match &event.dest {
                Some(dest) => self.moved.push((event.path.clone(), dest.clone())),
                None => {
                    self.deleted.insert(event.path.clone());
                }
            },
        }
    }

    /// Paths that need (re)parsing, including move destinations.
    pub fn paths_to_refresh(&self) -> BTreeSet<PathBuf> {
        self.created
            .iter()
            .chain(self.modified.iter())
            .chain(self.moved.iter().map(|(_, to)| to))
            .cloned()
            .collect()
    }

    /// Paths that must leave the index, including move sources.
    pub fn paths_to_remove(&self) -> BTreeSet<PathBuf> {
        self.deleted
            .iter()
            .chain(self.moved.iter().map(|(from, _)| from))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.moved.is_empty()
    }

    /// Total number of paths referenced by the batch.
    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len() + self.deleted.len() + self.moved.len()
    }
}
