//! Sightline Core Components
//!
//! This crate provides the orchestration layer for the Sightline daemon:
//! configuration loading and the per-root index service that hydrates,
//! scans, watches and reconciles.

mod config;
mod error;
mod service;

pub use config::DaemonConfig;
pub use error::CoreError;
pub use service::{IndexService, IndexUpdate};
