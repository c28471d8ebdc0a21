//! Configuration for the Sightline daemon.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use sightline_indexer::IndexerConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the per-project config inside the cache directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Indexing settings for the project root
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// How often the reconcile loop drains the scheduler
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Keep the index live by watching the tree
    #[serde(default = "default_watch")]
    pub watch: bool,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_watch() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            indexer: IndexerConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
            watch: default_watch(),
        }
    }
}

impl DaemonConfig {
    /// Load `<root>/.sightline/config.yaml`, falling back to defaults.
    ///
    /// The indexer root is always set to `root`, whatever the file says.
    pub fn load(root: &Path) -> Self {
        let defaults = IndexerConfig::default();
        let config_path = root.join(&defaults.cache_dir_name).join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = ?config_path, error = %e, "Ignoring config file");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.indexer.root = root.to_path_buf();
        config
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Root the indexer will operate on
    pub fn root(&self) -> &PathBuf {
        &self.indexer.root
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
