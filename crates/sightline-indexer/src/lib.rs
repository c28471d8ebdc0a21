//! Sightline Indexer
//!
//! This crate provides the incremental indexing engine for Sightline, including:
//! - Per-language symbol extraction via tree-sitter, with a plaintext fallback
//! - Full scans that prune excluded directories before descending
//! - A debounced change scheduler that coalesces events per path
//! - File watching that feeds the scheduler
//! - An in-memory symbol index with a derived project tree
//! - A JSON snapshot cache for warm starts

pub mod analyzer;
pub mod change;
pub mod config;
mod error;
pub mod filter;
pub mod index;
pub mod model;
pub mod scanner;
pub mod scheduler;
pub mod snapshot;
pub mod watcher;

pub use analyzer::{Analyzer, AnalyzerRegistry, Capability, CapabilityStatus};
pub use change::{ChangeBatch, ChangeEvent, ChangeEventType};
pub use config::IndexerConfig;
pub use error::IndexerError;
pub use filter::PathFilter;
pub use index::{IndexStats, ProjectTreeNode, SymbolIndex};
pub use model::{AnalysisError, FileSummary, SymbolInfo, SymbolKind};
pub use scanner::{ReconcileOutcome, Scanner};
pub use scheduler::ChangeScheduler;
pub use snapshot::SnapshotStore;
pub use watcher::FileWatcher;
