//! # docsift
//!
//! Document research over a local, persistent embedding index.
//!
//! Files (PDF, DOCX, PPTX, plain text, scanned images) are split into one
//! chunk per page or slide, embedded, and stored in SQLite. Queries return the
//! best passage per document with a page/chunk citation, and can optionally be
//! summarised into data-infrastructure themes by an LLM.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐
//! │  detect  │──▶│  extract  │──▶│ assemble  │──▶│    index     │
//! │ +ocr     │   │ pages     │   │ Document  │   │ SQLite+vecs  │
//! └──────────┘   └───────────┘   └───────────┘   └──────┬───────┘
//!                                                       │ search
//!                                  ┌──────────┐   ┌─────▼──────┐
//!                                  │  themes  │◀──│    rank    │
//!                                  └──────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsift init
//! docsift ingest ./papers
//! docsift search "database replication"
//! docsift search "stream processing" --themes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`detect`] | File-type detection |
//! | [`extract`] | Per-format text extraction |
//! | [`ocr`] | OCR engine and PDF rasteriser seams |
//! | [`processor`] | File → `Document` |
//! | [`embedding`] | Embedding providers |
//! | [`index`] | Persistent embedding index |
//! | [`ingest`] | Parallel batch ingestion |
//! | [`search`] | Ranked answers and themes |
//! | [`themes`] | LLM theme summarizer |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod config;
pub mod db;
pub mod detect;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod ocr;
pub mod processor;
pub mod search;
pub mod themes;

pub use docsift_core::{assemble, models, rank, theme};
