//! On-disk JSON snapshot of the index for warm starts.
//!
//! The file is a JSON array of entries sorted by path. Paths under the
//! project root are stored relative to it so the cache survives the project
//! being moved.

use crate::config::IndexerConfig;
use crate::model::{AnalysisError, FileSummary, SymbolInfo, SymbolKind};
use crate::IndexerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// File name of the snapshot inside the cache directory.
pub const SNAPSHOT_FILE_NAME: &str = "index.json";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    path: String,
    /// Whether `path` is relative to the project root
    relative: bool,
    modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    symbols: Vec<SnapshotSymbol>,
    #[serde(default)]
    errors: Vec<SnapshotError>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotSymbol {
    name: String,
    kind: SymbolKind,
    lineno: usize,
    parent: Option<String>,
    docstring: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotError {
    message: String,
    lineno: Option<usize>,
    col_offset: Option<usize>,
}

/// Reads and writes the snapshot file for one project root.
///
/// Clones share one write lock, so saves through any of them are serialized.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SnapshotStore {
    /// Store at an explicit file location.
    pub fn new(root: PathBuf, path: PathBuf) -> Self {
        Self {
            root,
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store at the configured cache location under a canonical root.
    pub fn for_root(root: PathBuf, config: &IndexerConfig) -> Self {
        let path = root.join(&config.cache_dir_name).join(SNAPSHOT_FILE_NAME);
        Self::new(root, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write all summaries atomically (temp file, then rename).
    pub async fn save(&self, summaries: &[FileSummary]) -> Result<(), IndexerError> {
        self.save_with(|| summaries.to_vec()).await
    }

    /// Collect summaries and write them while holding the write lock.
    ///
    /// Collecting under the lock means the last save to finish also wrote the
    /// most recent contents.
    pub async fn save_with<F>(&self, collect: F) -> Result<(), IndexerError>
    where
        F: FnOnce() -> Vec<FileSummary>,
    {
        let _guard = self.write_lock.lock().await;

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&dir).await?;

        let mut entries: Vec<SnapshotEntry> =
            collect().iter().filter_map(|s| self.to_entry(s)).collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let json = serde_json::to_string_pretty(&entries)?;
        let size = json.len();

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), IndexerError> {
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(json.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;

        info!(path = ?self.path, files = entries.len(), size, "Saved snapshot");

        Ok(())
    }

    /// Read the snapshot. Missing or corrupt files yield an empty list.
    pub async fn load(&self) -> Vec<FileSummary> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No snapshot present");
            return Vec::new();
        }

        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(j) => j,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read snapshot");
                return Vec::new();
            }
        };

        let entries: Vec<SnapshotEntry> = match serde_json::from_str(&json) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Ignoring corrupt snapshot");
                return Vec::new();
            }
        };

        let summaries: Vec<FileSummary> = entries.into_iter().map(|e| self.from_entry(e)).collect();
        debug!(path = ?self.path, files = summaries.len(), "Loaded snapshot");
        summaries
    }

    /// Delete the snapshot file if present.
    pub async fn clear(&self) -> Result<(), IndexerError> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    /// Paths that are not valid UTF-8 cannot round-trip through JSON and are
    /// left out of the snapshot.
    fn to_entry(&self, summary: &FileSummary) -> Option<SnapshotEntry> {
        let (path, relative) = match summary.path.strip_prefix(&self.root) {
            Ok(rel) => (rel.to_str(), true),
            Err(_) => (summary.path.to_str(), false),
        };
        let Some(path) = path.map(str::to_string) else {
            warn!(path = ?summary.path, "Skipping non UTF-8 path in snapshot");
            return None;
        };

        Some(SnapshotEntry {
            path,
            relative,
            modified_at: summary.modified_at,
            symbols: summary
                .symbols
                .iter()
                .map(|s| SnapshotSymbol {
                    name: s.name.clone(),
                    kind: s.kind,
                    lineno: s.line,
                    parent: s.parent.clone(),
                    docstring: s.doc.clone(),
                })
                .collect(),
            errors: summary
                .errors
                .iter()
                .map(|e| SnapshotError {
                    message: e.message.clone(),
                    lineno: e.line,
                    col_offset: e.column,
                })
                .collect(),
        })
    }

    fn from_entry(&self, entry: SnapshotEntry) -> FileSummary {
        let path = if entry.relative {
            self.root.join(&entry.path)
        } else {
            PathBuf::from(&entry.path)
        };

        FileSummary {
            symbols: entry
                .symbols
                .into_iter()
                .map(|s| SymbolInfo {
                    name: s.name,
                    kind: s.kind,
                    path: path.clone(),
                    line: s.lineno,
                    parent: s.parent,
                    doc: s.docstring,
                })
                .collect(),
            errors: entry
                .errors
                .into_iter()
                .map(|e| AnalysisError {
                    message: e.message,
                    line: e.lineno,
                    column: e.col_offset,
                })
                .collect(),
            modified_at: entry.modified_at,
            path,
        }
    }
}
