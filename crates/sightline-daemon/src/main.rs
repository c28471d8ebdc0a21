//! Sightline Daemon
//!
//! Keeps a live symbol index of a project tree and persists it for warm
//! starts.

mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sightline_core::{DaemonConfig, IndexService};
use sightline_indexer::{CapabilityStatus, IndexStats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sightline")]
#[command(about = "Sightline - live code-intelligence index")]
#[command(version)]
struct Cli {
    /// Project root to index
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Config file (default: <ROOT>/.sightline/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not watch the tree for changes
    #[arg(long)]
    no_watch: bool,

    /// Scan and persist once, print a summary, then exit
    #[arg(long)]
    once: bool,
}

/// Summary printed by `--once`
#[derive(Serialize)]
struct Report<'a> {
    root: &'a std::path::Path,
    stats: IndexStats,
    capabilities: &'a [CapabilityStatus],
}

fn load_config(cli: &Cli) -> Result<DaemonConfig> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DaemonConfig::load(&cli.root),
    };
    config.indexer.root = cli.root.clone();
    if cli.no_watch {
        config.watch = false;
    }
    Ok(config)
}

/// Run the daemon
async fn run(config: DaemonConfig, once: bool) -> Result<()> {
    let service = IndexService::new(config).context("Failed to open project root")?;

    if once {
        let stats = service.run_once().await.context("Scan failed")?;
        let report = Report {
            root: service.root(),
            stats,
            capabilities: service.capability_report(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tracing::info!(root = ?service.root(), "Index service starting");
    service
        .run(signals::wait_for_shutdown())
        .await
        .context("Index service failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Sightline v{}", env!("CARGO_PKG_VERSION"));

    // Run async runtime
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config, cli.once))
}
