//! Batch ingestion: collect files, extract in parallel, index in order.
//!
//! Extraction is CPU- and subprocess-bound, so each file runs on the blocking
//! pool via `spawn_blocking`, with at most `ingest.workers` in flight. Files
//! that fail to process are logged and counted; they never abort the batch.
//! Indexing then happens sequentially in input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use docsift_core::models::Document;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use crate::app::App;
use crate::config::IngestConfig;
use crate::processor::{DocumentProcessor, ProcessError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub processed: usize,
    pub failed: usize,
    pub chunks_written: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Expand `paths` into the files to ingest.
///
/// Files named directly are always included. Directories are walked and
/// filtered through `include_globs`/`exclude_globs` (matched on the path
/// relative to the directory).
pub fn collect_files(paths: &[PathBuf], config: &IngestConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            bail!("Path does not exist: {}", root.display());
        }

        let mut walker = WalkDir::new(root).follow_links(config.follow_symlinks);
        if !config.recursive {
            walker = walker.max_depth(1);
        }

        let mut found = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            found.push(path.to_path_buf());
        }

        // Sort for deterministic ordering
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Process `files` on at most `workers` blocking threads. Output keeps input order.
pub async fn process_files(
    processor: Arc<DocumentProcessor>,
    files: Vec<PathBuf>,
    workers: usize,
) -> Result<Vec<(PathBuf, Result<Document, ProcessError>)>> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let processor = processor.clone();
        let worker_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            processor.process_document(&worker_path)
        });
        handles.push((path, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        // A panicking worker fails its own file only.
        let outcome = handle.await.unwrap_or_else(|e| {
            tracing::error!(path = %path.display(), error = %e, "extraction worker failed");
            Err(ProcessError::WorkerFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        });
        results.push((path, outcome));
    }
    Ok(results)
}

/// Collect, process, and index `paths`.
pub async fn ingest_paths(app: &App, paths: &[PathBuf]) -> Result<IngestReport> {
    let files = collect_files(paths, &app.config.ingest)?;
    let workers = app.config.ingest.worker_count();
    tracing::info!(files = files.len(), workers, "ingesting");

    let mut report = IngestReport {
        files: files.len(),
        ..IngestReport::default()
    };

    for (path, outcome) in process_files(app.processor.clone(), files, workers).await? {
        let document = match outcome {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping file");
                report.failed += 1;
                report.failures.push((path, e.to_string()));
                continue;
            }
        };

        match app.index.add(&document).await {
            Ok(n) => {
                report.processed += 1;
                report.chunks_written += n;
            }
            Err(e) => {
                report.failed += 1;
                report.failures.push((path, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Replace the indexed records of one file.
pub async fn reindex_path(app: &App, path: &Path) -> Result<(String, usize)> {
    let processor = app.processor.clone();
    let owned = path.to_path_buf();
    let document = tokio::task::spawn_blocking(move || processor.process_document(&owned)).await??;
    let written = app.index.reindex(&document).await?;
    Ok((document.metadata.doc_id, written))
}

pub async fn run_ingest(app: &App, paths: &[PathBuf]) -> Result<()> {
    let report = ingest_paths(app, paths).await?;

    println!("ingest");
    println!("  files: {}", report.files);
    println!("  processed: {}", report.processed);
    println!("  failed: {}", report.failed);
    for (path, reason) in &report.failures {
        println!("    {}: {}", path.display(), reason);
    }
    println!("  chunks written: {}", report.chunks_written);
    println!("ok");
    Ok(())
}
