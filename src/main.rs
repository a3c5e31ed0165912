//! # ksync CLI
//!
//! Command-line interface for the knowledge sync engine.
//!
//! ## Commands
//!
//! - `ksync check` - Report what a sync would change (no mutation)
//! - `ksync sync` - Incremental sync (alias: `auto`)
//! - `ksync force` - Rebuild every file, ignoring recorded hashes
//! - `ksync status` - Totals of the current sync state
//! - `ksync watch` - Incremental sync on an interval until Ctrl-C
//!
//! ## Examples
//!
//! ```bash
//! # See what changed since the last run
//! ksync --corpus data/knowledge check
//!
//! # Apply it
//! ksync --corpus data/knowledge sync
//!
//! # Per-file listing as JSON
//! ksync status --files --json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knowledge_sync::config::Config;
use knowledge_sync::embedding::FastEmbedManager;
use knowledge_sync::error::SyncError;
use knowledge_sync::report;
use knowledge_sync::sync::{SyncClients, SyncEngine};
use knowledge_sync::types::SyncMode;
use knowledge_sync::vector_db::LanceVectorIndex;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")\nformats: ",
    env!("BUILT_FORMATS")
);

#[derive(Parser)]
#[command(name = "ksync")]
#[command(about = "Keep a vector search index in sync with a document corpus")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Path to config file (default: <config dir>/knowledge-sync/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Corpus root directory (overrides config)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Sync state file (overrides config)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report added, modified, removed and skipped files without changing anything
    Check,

    /// Apply only what changed since the last run
    #[command(visible_alias = "auto")]
    Sync,

    /// Rebuild the index for every file, ignoring recorded hashes
    Force,

    /// Show totals of the current sync state
    Status {
        /// List every recorded file with its chunk count
        #[arg(long)]
        files: bool,
    },

    /// Run an incremental sync every interval until interrupted
    Watch {
        /// Seconds between passes
        #[arg(long, default_value_t = 3600)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            report_error("Error", &e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(context: &str, e: &anyhow::Error) {
    eprintln!("{}: {:#}", context, e);
    if let Some(sync_err) = e.downcast_ref::<SyncError>()
        && sync_err.requires_force()
    {
        eprintln!("Hint: run `ksync force` to rebuild the index and state");
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("knowledge_sync={0},ksync={0},warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(corpus) = &cli.corpus {
        config.corpus.root = corpus.clone();
    }
    if let Some(state) = &cli.state {
        config.sync.state_path = state.clone();
    }
    Ok(config)
}

fn build_engine(cli: &Cli) -> Result<SyncEngine> {
    Ok(SyncEngine::new(load_config(cli)?)?)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        // check and status report problems but never fail the invocation
        Commands::Check => {
            if let Err(e) = check(&cli).await {
                report_error("Check failed", &e);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { files } => {
            if let Err(e) = status(&cli, files) {
                report_error("Status unavailable", &e);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sync => run_pass(&build_engine(&cli)?, SyncMode::Incremental, cli.json).await,
        Commands::Force => run_pass(&build_engine(&cli)?, SyncMode::Force, cli.json).await,
        Commands::Watch { interval } => {
            watch(
                &build_engine(&cli)?,
                Duration::from_secs(interval.max(1)),
                cli.json,
            )
            .await
        }
    }
}

async fn check(cli: &Cli) -> Result<()> {
    let check = build_engine(cli)?.check().await?;
    print_report(cli.json, &check, report::render_check(&check))
}

fn status(cli: &Cli, files: bool) -> Result<()> {
    let status = build_engine(cli)?.status(files)?;
    print_report(cli.json, &status, report::render_status(&status))
}

async fn build_clients(config: &Config) -> Result<SyncClients> {
    let model_name = config.embedding.model_name.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedManager::from_name(&model_name))
        .await
        .context("Embedding model initialization task failed")??;

    let lancedb_path = config.vector_db.lancedb_path.to_string_lossy().to_string();
    let index = LanceVectorIndex::with_path(&lancedb_path, &config.vector_db.table_name).await?;

    Ok(SyncClients {
        embedder: Arc::new(embedder),
        index: Arc::new(index),
    })
}

/// Cancel the returned token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight files before stopping");
            child.cancel();
        }
    });
    token
}

async fn run_pass(engine: &SyncEngine, mode: SyncMode, json: bool) -> Result<ExitCode> {
    let clients = build_clients(engine.config()).await?;
    let cancel = cancel_on_interrupt();

    let summary = engine.sync(&clients, mode, cancel).await?;
    print_report(json, &summary, report::render_sync(&summary))?;

    // Partial success still exits 0; the next run retries what is pending
    Ok(ExitCode::SUCCESS)
}

async fn watch(engine: &SyncEngine, interval: Duration, json: bool) -> Result<ExitCode> {
    let clients = build_clients(engine.config()).await?;
    let cancel = cancel_on_interrupt();

    tracing::info!("Watching {:?} every {:?}", engine.config().corpus.root, interval);

    loop {
        match engine.check().await {
            Ok(check) if check.changes.is_empty() => {
                tracing::info!("No changes; next check in {:?}", interval);
            }
            Ok(_) => match engine
                .sync(&clients, SyncMode::Incremental, cancel.child_token())
                .await
            {
                Ok(summary) => print_report(json, &summary, report::render_sync(&summary))?,
                Err(e @ SyncError::AlreadySyncing { .. }) => {
                    tracing::warn!("Skipping this cycle: {}", e);
                }
                Err(e) if e.is_fatal_for_invocation() => return Err(e.into()),
                Err(e) => tracing::error!("Sync cycle failed: {}", e),
            },
            Err(e) if e.is_fatal_for_invocation() => return Err(e.into()),
            Err(e) => tracing::error!("Check failed: {}", e),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Watch stopped");
    Ok(ExitCode::SUCCESS)
}

fn print_report<T: Serialize>(json: bool, report: &T, text: String) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", text);
    }
    Ok(())
}
