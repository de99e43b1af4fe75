//! # docsift CLI
//!
//! ```bash
//! docsift --config ./config/docsift.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsift init` | Create the index directory and schema |
//! | `docsift ingest <PATH>...` | Extract and index files or directories |
//! | `docsift reindex <PATH>` | Replace one file's records |
//! | `docsift search "<query>"` | Best passage per document, optional themes |
//! | `docsift delete <DOC_ID>` | Remove a document |
//! | `docsift list` | List indexed documents |
//! | `docsift stats` | Record and document counts |
//! | `docsift clear` | Remove every record |

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docsift::app::App;
use docsift::{config, ingest, logging, search};

/// docsift: ask questions over your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docsift.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docsift",
    about = "docsift: document research over a local embedding index",
    version,
    long_about = "docsift extracts text from PDF, DOCX, PPTX, plain-text and image files \
    (with OCR for scans), indexes one chunk per page in a persistent embedding store, and \
    answers questions with the best passage per document and an optional theme summary."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsift.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index directory and schema. Safe to run repeatedly.
    Init,

    /// Extract and index files.
    ///
    /// Directories are walked and filtered through `[ingest]` globs; files
    /// named directly are always attempted. Re-ingesting a file appends a
    /// second copy; use `reindex` to replace it.
    Ingest {
        /// Files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete a file's existing records and index it again.
    Reindex {
        path: PathBuf,
    },

    /// Search indexed documents.
    Search {
        /// The question or phrase to search for.
        query: String,

        /// Maximum number of chunk hits to consider.
        #[arg(long)]
        limit: Option<usize>,

        /// Metadata filter as `key=value` (doc_id, title, doc_type, page_number).
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Summarise themes across the hits (needs `[themes] enabled = true`).
        #[arg(long)]
        themes: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Remove every record of a document.
    Delete {
        doc_id: String,
    },

    /// List indexed document ids.
    List,

    /// Show record and document counts.
    Stats,

    /// Remove every record from the index.
    Clear,
}

/// Parse a `key=value` pair for `--filter` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    let app = App::from_config(cfg).await?;

    match cli.command {
        Commands::Init => {
            println!(
                "Index initialized at {}",
                app.config.db_path().display()
            );
        }
        Commands::Ingest { paths } => {
            ingest::run_ingest(&app, &paths).await?;
        }
        Commands::Reindex { path } => {
            let (doc_id, written) = ingest::reindex_path(&app, &path).await?;
            println!("reindexed {}: {} chunks", doc_id, written);
        }
        Commands::Search {
            query,
            limit,
            filters,
            themes,
            json,
        } => {
            let filters: BTreeMap<String, String> = filters.into_iter().collect();
            search::run_search(&app, &query, limit, &filters, themes, json).await?;
        }
        Commands::Delete { doc_id } => {
            let removed = app.index.delete(&doc_id).await?;
            if removed == 0 {
                println!("No document '{}'.", doc_id);
            } else {
                println!("deleted {}: {} chunks", doc_id, removed);
            }
        }
        Commands::List => {
            let ids = app.index.document_ids().await?;
            if ids.is_empty() {
                println!("No documents.");
            }
            for id in ids {
                println!("{}", id);
            }
        }
        Commands::Stats => {
            let documents = app.index.document_ids().await?.len();
            let chunks = app.index.count().await?;
            let embedder = app.index.embedder();
            println!("documents: {}", documents);
            println!("chunks: {}", chunks);
            println!("model: {} ({} dims)", embedder.model_name(), embedder.dims());
        }
        Commands::Clear => {
            app.index.clear().await?;
            println!("Index cleared.");
        }
    }

    app.index.close().await;
    Ok(())
}
