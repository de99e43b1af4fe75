//! Query → ranked answers (and optional themes).

use std::collections::BTreeMap;

use anyhow::Result;
use docsift_core::rank::{rank_results, RankOptions, RankedAnswer};
use docsift_core::theme::{apply_data_policy, Theme};
use serde::Serialize;

use crate::app::App;
use crate::themes::format_theme;

#[derive(Debug, Default, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub answers: Vec<RankedAnswer>,
    pub themes: Vec<Theme>,
}

/// Search, rank one answer per document, and optionally summarise themes.
///
/// Index and summarizer failures are logged and degrade to empty lists.
pub async fn search(
    app: &App,
    query: &str,
    limit: Option<usize>,
    filters: &BTreeMap<String, String>,
    with_themes: bool,
) -> SearchOutcome {
    let mut outcome = SearchOutcome {
        query: query.to_string(),
        ..SearchOutcome::default()
    };
    if query.trim().is_empty() {
        return outcome;
    }

    let n_results = limit.unwrap_or(app.config.retrieval.n_results);
    let raw = match app.index.search(query, n_results, filters).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "index search failed");
            Vec::new()
        }
    };

    let opts = RankOptions {
        snippet_chars: app.config.retrieval.snippet_chars,
    };
    outcome.answers = rank_results(&raw, &opts);

    if with_themes && !raw.is_empty() {
        match &app.summarizer {
            Some(summarizer) => match summarizer.extract_themes(&raw, Some(query)).await {
                Ok(themes) => outcome.themes = apply_data_policy(themes),
                Err(e) => tracing::warn!(error = %e, "theme extraction failed"),
            },
            None => tracing::info!("themes requested but no summarizer is configured"),
        }
    }

    outcome
}

pub async fn run_search(
    app: &App,
    query: &str,
    limit: Option<usize>,
    filters: &BTreeMap<String, String>,
    with_themes: bool,
    json: bool,
) -> Result<()> {
    let outcome = search(app, query, limit, filters, with_themes).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.answers.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, answer) in outcome.answers.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            answer.relevance,
            answer.filename,
            answer.doc_id
        );
        println!("    {}", answer.citation);
        println!("    {}", answer.answer);
        println!();
    }

    if !outcome.themes.is_empty() {
        println!("Themes");
        println!();
        for theme in &outcome.themes {
            println!("{}", format_theme(theme));
        }
    }

    Ok(())
}
