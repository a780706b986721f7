//! # Fractal Search CLI (`fsearch`)
//!
//! ## Usage
//!
//! ```bash
//! fsearch --config ./config/fsearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fsearch init` | Create the SQLite database and the configured index |
//! | `fsearch label <file>` | Partition a JSON batch and print labels (no writes) |
//! | `fsearch index <file>` | Partition a batch and index it with its labels |
//! | `fsearch add <id> <text>` | Index one document under a given label |
//! | `fsearch search "<query>"` | Search, optionally within one label |
//! | `fsearch get <id>` | Retrieve a stored document |
//! | `fsearch stats` | Show document counts per label |
//! | `fsearch serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fractal_search::config::{self, Config};
use fractal_search::ingest::{self, DocumentSource};
use fractal_search::{get, migrate, search, server, stats};

/// Fractal Search: hierarchical similarity labels plus label-filtered
/// full-text search.
#[derive(Parser)]
#[command(
    name = "fsearch",
    about = "Fractal Search — hierarchical similarity labels with label-filtered full-text search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and index. Safe to run repeatedly.
    Init,

    /// Partition a JSON batch and print each document's label.
    ///
    /// Nothing is written. Works without a config file.
    Label {
        /// JSON array of `{ "doc_id": ..., "text": ... }` objects.
        file: PathBuf,

        /// Largest group that is not split further (overrides config).
        #[arg(long)]
        max_documents: Option<usize>,

        /// Print the mapping as a JSON object.
        #[arg(long)]
        json: bool,
    },

    /// Partition a batch and index it with the computed labels.
    Index {
        /// JSON array of documents. Omit when using `--filesystem`.
        #[arg(required_unless_present = "filesystem", conflicts_with = "filesystem")]
        file: Option<PathBuf>,

        /// Read documents from `[sources.filesystem]` instead of a file.
        #[arg(long)]
        filesystem: bool,

        #[arg(long)]
        max_documents: Option<usize>,
    },

    /// Index a single document without partitioning.
    Add {
        id: String,
        text: String,

        /// Label to store (default `root`).
        #[arg(long)]
        label: Option<String>,
    },

    /// Search indexed documents.
    Search {
        query: String,

        /// Only return documents with exactly this label.
        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a stored document.
    Get { id: String },

    /// Show document counts per label.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Labelling is pure; a config file is optional.
    if let Commands::Label {
        file,
        max_documents,
        json,
    } = &cli.command
    {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
        ingest::run_label(&cfg, &DocumentSource::JsonFile(file), *max_documents, *json)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        // Handled above (before config loading)
        Commands::Label { .. } => {}
        Commands::Index {
            file,
            filesystem,
            max_documents,
        } => {
            let source = match (&file, filesystem) {
                (Some(path), false) => DocumentSource::JsonFile(path),
                _ => DocumentSource::Filesystem,
            };
            ingest::run_index(&cfg, &source, max_documents).await?;
        }
        Commands::Add { id, text, label } => {
            ingest::run_add(&cfg, &id, &text, label.as_deref()).await?;
        }
        Commands::Search {
            query,
            label,
            limit,
        } => {
            search::run_search(&cfg, &query, label, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
