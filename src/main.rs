//! # Quill CLI (`quill`)
//!
//! Index a markdown vault, query it semantically, and review diffs.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quill init` | Create the SQLite index database |
//! | `quill index [--full]` | Embed new and changed notes |
//! | `quill query "<text>"` | Refresh the index and print the closest chunks |
//! | `quill diff <a> <b>` | Show a block diff between two files |
//!
//! ## Examples
//!
//! ```bash
//! quill --config ./quill.toml init
//! quill index --full
//! quill query "how do I rotate keys" --folder ops --json
//! QUILL_LOG=quill=debug quill index
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use quill::config;
use quill::progress::ProgressMode;
use quill::rag::{RagEngine, RagSettings};
use quill::sqlite_store::SqliteVectorStore;
use quill::vault::FsDocumentStore;
use quill::{db, embedding, migrate};
use quill_core::diff::{highlight_all, DiffBlock, DiffReview};
use quill_core::models::{SearchScope, SimilarityResult};
use quill_core::store::VectorStore;

/// Quill: incremental vault indexing, semantic retrieval, and reviewable diffs.
#[derive(Parser)]
#[command(name = "quill", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./quill.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index database and its schema. Idempotent.
    Init,

    /// Embed notes that are new or changed since the last run.
    Index {
        /// Drop the model's chunks and embed every note again.
        #[arg(long)]
        full: bool,
    },

    /// Refresh the index, then print the chunks most similar to TEXT.
    Query {
        text: String,

        /// Restrict results to this file (repeatable).
        #[arg(long = "file")]
        files: Vec<String>,

        /// Restrict results to files under this folder (repeatable).
        #[arg(long = "folder")]
        folders: Vec<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Diff two files block by block. Does not need a config file.
    Diff {
        original: PathBuf,
        modified: PathBuf,

        /// Print blocks with token highlights as JSON.
        #[arg(long)]
        json: bool,

        /// Accept every change and print the resulting text.
        #[arg(long)]
        accept_all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QUILL_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let progress_mode = cli
        .progress
        .map(ProgressMode::from)
        .unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Init => {
            let cfg = config::load_config(&cli.config)?;
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { full } => {
            let engine = open_engine(&cli.config).await?;
            let cancel = CancellationToken::new();
            spawn_ctrl_c(cancel.clone());

            let reporter = progress_mode.reporter();
            let summary = engine.reindex(full, reporter.as_ref(), &cancel).await?;
            println!(
                "Indexed {} chunks from {} files ({} removed, {} unreadable).",
                summary.embedded_chunks,
                summary.indexed_files,
                summary.deleted_paths.len(),
                summary.failed_documents.len()
            );
            for path in &summary.failed_documents {
                eprintln!("  unreadable: {}", path);
            }
        }
        Commands::Query {
            text,
            files,
            folders,
            json,
        } => {
            let engine = open_engine(&cli.config).await?;
            let cancel = CancellationToken::new();
            spawn_ctrl_c(cancel.clone());

            let scope = SearchScope { files, folders };
            let reporter = progress_mode.reporter();
            let results = engine
                .query(&text, Some(scope), reporter.as_ref(), &cancel)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Commands::Diff {
            original,
            modified,
            json,
            accept_all,
        } => run_diff(&original, &modified, json, accept_all)?,
    }

    Ok(())
}

async fn open_engine(config_path: &Path) -> anyhow::Result<RagEngine> {
    let cfg = config::load_config(config_path)?;
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;
    let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool));
    let documents = Arc::new(FsDocumentStore::from_config(&cfg.vault));
    let model = embedding::create_model(&cfg.embedding)?;
    Ok(RagEngine::new(
        documents,
        store,
        model,
        RagSettings::from_config(&cfg),
    ))
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing the current batch");
            cancel.cancel();
        }
    });
}

fn print_results(results: &[SimilarityResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}:{}-{}  (modified {})",
            i + 1,
            r.similarity,
            r.path,
            r.metadata.start_line,
            r.metadata.end_line,
            format_ts_iso(r.modified_time)
        );
        let snippet: String = r.content.chars().take(200).collect();
        for line in snippet.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

fn run_diff(original: &Path, modified: &Path, json: bool, accept_all: bool) -> anyhow::Result<()> {
    let original_text = std::fs::read_to_string(original)
        .with_context(|| format!("Failed to read {}", original.display()))?;
    let modified_text = std::fs::read_to_string(modified)
        .with_context(|| format!("Failed to read {}", modified.display()))?;

    let mut review = DiffReview::from_texts(&original_text, &modified_text);

    if accept_all {
        review.accept_all();
        print!("{}", review.finalize());
        return Ok(());
    }

    if json {
        highlight_all(review.blocks_mut());
        println!("{}", serde_json::to_string_pretty(review.blocks())?);
        return Ok(());
    }

    for block in review.blocks() {
        match block {
            DiffBlock::Unchanged { value } => print_prefixed(' ', value),
            DiffBlock::Modified(m) => {
                if let Some(old) = &m.original_value {
                    print_prefixed('-', old);
                }
                if let Some(new) = &m.modified_value {
                    print_prefixed('+', new);
                }
            }
        }
    }
    eprintln!("{} changed blocks", review.pending());
    Ok(())
}

fn print_prefixed(prefix: char, text: &str) {
    for line in text.split('\n') {
        println!("{}{}", prefix, line);
    }
}
