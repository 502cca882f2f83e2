//! Command line host for the PDF search indexer.
//!
//! `serve` keeps a long-running host that delivers queued batches and runs
//! the watchdog. The other commands perform a single operation and exit.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_search_indexer::{
    load_config, BatchOutcome, HostCommand, HostScheduler, Indexer, IndexerConfig,
    StatusSnapshot,
};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "pdf-indexer", version, about = "Resumable PDF text indexing")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, env = "PDF_INDEXER_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overrides the configured location
    #[arg(short, long, global = true, env = "PDF_INDEXER_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the host loop until interrupted
    Serve {
        /// Seconds between task queue polls
        #[arg(long, default_value_t = 1)]
        poll_secs: u64,
    },
    /// Run one batch now
    Batch,
    /// Run one watchdog check now
    Watchdog,
    /// Show indexing progress
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Schedule an immediate batch
    Start,
    /// Clear pending batches and reset progress
    Stop,
    /// Restart a stalled or stopped run
    Restart,
    /// Drop all indexed text and index everything again
    Reindex,
    /// Register a single file
    Add {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Register every PDF under a directory
    Scan { dir: PathBuf },
    /// Search indexed text
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.database)?;
    let indexer = Indexer::open(config).context("Failed to open the indexer")?;

    match cli.command {
        Commands::Serve { poll_secs } => serve(indexer, Duration::from_secs(poll_secs.max(1)))?,
        Commands::Batch => print_outcome(&indexer.run_batch()),
        Commands::Watchdog => {
            let outcome = indexer.run_watchdog()?;
            println!("Watchdog: {:?}", outcome);
        }
        Commands::Status { json } => {
            let status = indexer.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Commands::Start => {
            if indexer.start()? {
                println!("Indexing started");
            } else {
                println!("Nothing scheduled (already pending or disabled)");
            }
        }
        Commands::Stop => {
            let cleared = indexer.stop()?;
            println!("Indexing stopped, {} pending batch(es) cleared", cleared);
        }
        Commands::Restart => {
            indexer.restart()?;
            println!("Indexing restarted");
        }
        Commands::Reindex => {
            indexer.reindex_all()?;
            println!("Re-indexing scheduled");
        }
        Commands::Add { file, title } => {
            let path = file
                .canonicalize()
                .with_context(|| format!("File not found: {}", file.display()))?;
            let id = indexer.register_document(&path, title.as_deref())?;
            println!("Registered document {}", id);
        }
        Commands::Scan { dir } => {
            let report = indexer
                .scan(&dir)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            println!(
                "Registered {} new PDF(s), {} already known",
                report.registered.len(),
                report.skipped
            );
        }
        Commands::Search { query, limit } => {
            let hits = indexer.search(&query, limit)?;
            if hits.is_empty() {
                println!("No matches");
            }
            for hit in hits {
                println!("[{}] {}", hit.id, hit.title);
                println!("    {}", hit.snippet);
            }
        }
    }

    Ok(())
}

fn init_logging() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_search_indexer=info,pdf_indexer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn resolve_config(path: Option<&Path>, database: Option<PathBuf>) -> Result<IndexerConfig> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => IndexerConfig::default(),
    };
    if database.is_some() {
        config.database_path = database;
    }
    Ok(config)
}

fn serve(indexer: Indexer, poll_interval: Duration) -> Result<()> {
    let indexer = Arc::new(indexer);
    let host = HostScheduler::new(Arc::clone(&indexer), poll_interval);
    let (trigger_tx, trigger_rx) = broadcast::channel(16);

    let (interrupt_tx, interrupt_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("Failed to install the interrupt handler")?;

    if indexer.start()? {
        log::info!("Queued an initial batch");
    }
    let handle = host.start(trigger_rx);
    log::info!("Serving, press Ctrl-C to stop");

    let _ = interrupt_rx.recv();
    log::info!("Shutting down");
    host.stop();
    let _ = trigger_tx.send(HostCommand::RunWatchdog);
    if handle.join().is_err() {
        anyhow::bail!("Host thread panicked");
    }
    Ok(())
}

fn print_outcome(outcome: &BatchOutcome) {
    match outcome {
        BatchOutcome::Continue { delay } => {
            println!("Batch done, next batch in {}s", delay.as_secs())
        }
        BatchOutcome::Drained => println!("Indexing complete, queue drained"),
        BatchOutcome::Aborted(reason) => println!("Batch aborted: {:?}", reason),
        BatchOutcome::Busy => println!("Another batch holds the lock, skipped"),
    }
}

fn print_status(status: &StatusSnapshot) {
    println!("Enabled:   {}", status.enabled);
    println!("Status:    {}", status.process_status);
    println!(
        "Indexed:   {}/{} ({:.1}%)",
        status.indexed_documents, status.total_documents, status.percentage
    );
    println!("Secured:   {}", status.secured_documents);
    println!("Failed:    {}", status.failed_documents);
    println!("Pending:   {}", status.pending_documents);
    if !status.progress.current_file.is_empty() {
        println!("Current:   {}", status.progress.current_file);
    }
    match status.next_batch_at {
        Some(at) => println!("Next run:  {}", at.to_rfc3339()),
        None => println!("Next run:  not scheduled"),
    }
    if !status.progress.errors.is_empty() {
        println!("Recent errors:");
        for error in &status.progress.errors {
            println!("  {} {:?}: {}", error.file, error.kind, error.message);
        }
    }
}
