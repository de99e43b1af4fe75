//! LLM-backed theme extraction over search results.
//!
//! [`OpenAiThemeSummarizer`] groups hits by document, builds one prompt from
//! per-document excerpts, and asks a chat-completions model for a JSON list
//! of themes. Requests are attempted up to `themes.max_attempts` times with
//! exponential backoff between 4 and 10 seconds. Themes below
//! `themes.min_confidence` are dropped and at most `themes.max_themes` are
//! kept. The data-infrastructure policy filter
//! ([`apply_data_policy`](docsift_core::theme::apply_data_policy)) is left to
//! the caller.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use docsift_core::models::SearchResult;
use docsift_core::theme::{filter_by_confidence, Theme};
use thiserror::Error;

use crate::config::ThemesConfig;

/// Characters of combined chunk text kept per document.
const DOC_TEXT_MAX_CHARS: usize = 10_000;
/// Characters of each document shown in the prompt.
const PROMPT_DOC_MAX_CHARS: usize = 2_000;
/// Supporting documents listed by [`format_theme`].
const DISPLAY_SUPPORTING_DOCS: usize = 5;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that analyzes documents and identifies key themes.";

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("theme request failed: {0}")]
    Request(String),
    #[error("theme request failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("could not parse theme response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ThemeSummarizer: Send + Sync {
    /// Themes across `results`, optionally focused on `query`.
    async fn extract_themes(
        &self,
        results: &[SearchResult],
        query: Option<&str>,
    ) -> Result<Vec<Theme>, ThemeError>;
}

pub struct OpenAiThemeSummarizer {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_themes: usize,
    min_confidence: f64,
    max_attempts: u32,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl OpenAiThemeSummarizer {
    /// Build from config, reading the key from `OPENAI_API_KEY`.
    pub fn new(config: &ThemesConfig) -> Result<Self, ThemeError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| ThemeError::MissingApiKey)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ThemesConfig, api_key: String) -> Result<Self, ThemeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ThemeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_themes: config.max_themes,
            min_confidence: config.min_confidence,
            max_attempts: config.max_attempts.max(1),
            backoff_min: Duration::from_secs(4),
            backoff_max: Duration::from_secs(10),
        })
    }

    /// Override the retry delay bounds.
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min = min;
        self.backoff_max = max;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(1u64 << attempt.min(16));
        exp.clamp(self.backoff_min, self.backoff_max)
    }

    async fn complete(&self, prompt: &str) -> Result<String, ThemeError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "max_tokens": 2000,
            "top_p": 1.0,
            "frequency_penalty": 0.0,
            "presence_penalty": 0.0,
        });
        let url = format!("{}/chat/completions", self.api_base);
        let mut last = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = self.backoff(attempt - 1);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %last, "retrying theme request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| ThemeError::Parse(e.to_string()))?;
                        return json
                            .pointer("/choices/0/message/content")
                            .and_then(|c| c.as_str())
                            .map(str::to_string)
                            .ok_or_else(|| ThemeError::Parse("missing choices[0].message.content".to_string()));
                    }

                    let text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last = format!("API error {}: {}", status, text);
                        continue;
                    }
                    return Err(ThemeError::Request(format!("API error {}: {}", status, text)));
                }
                Err(e) => {
                    last = e.to_string();
                }
            }
        }

        Err(ThemeError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}

#[async_trait]
impl ThemeSummarizer for OpenAiThemeSummarizer {
    async fn extract_themes(
        &self,
        results: &[SearchResult],
        query: Option<&str>,
    ) -> Result<Vec<Theme>, ThemeError> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let docs = group_by_document(results);
        let prompt = build_prompt(&docs, query, self.max_themes, self.min_confidence);
        let content = self.complete(&prompt).await?;
        let themes = parse_themes(&content)?;

        Ok(filter_by_confidence(themes, self.min_confidence, self.max_themes))
    }
}

/// One document's evidence, as sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct DocExcerpt {
    pub doc_id: String,
    pub title: String,
    pub source: String,
    pub doc_type: String,
    pub upload_date: String,
    pub text: String,
}

/// Group hits by document in first-seen order; chunks best-first, capped.
pub fn group_by_document(results: &[SearchResult]) -> Vec<DocExcerpt> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&SearchResult>> = HashMap::new();

    for result in results {
        let doc_id = result.chunk.doc_id.as_str();
        groups
            .entry(doc_id)
            .or_insert_with(|| {
                order.push(doc_id);
                Vec::new()
            })
            .push(result);
    }

    order
        .into_iter()
        .filter_map(|doc_id| {
            let mut hits = groups.remove(doc_id)?;
            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            let first = hits[0];
            let combined = hits
                .iter()
                .map(|h| h.chunk.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            Some(DocExcerpt {
                doc_id: doc_id.to_string(),
                title: first.document.title.clone(),
                source: first.chunk.metadata.get("source").cloned().unwrap_or_default(),
                doc_type: first.document.doc_type.to_string(),
                upload_date: first.document.upload_date.to_rfc3339(),
                text: combined.chars().take(DOC_TEXT_MAX_CHARS).collect(),
            })
        })
        .collect()
}

pub fn build_prompt(
    docs: &[DocExcerpt],
    query: Option<&str>,
    max_themes: usize,
    min_confidence: f64,
) -> String {
    let mut prompt = String::from(
        "Analyze the following documents and identify the key themes. For each theme, provide:\n\
         1. A clear, concise name\n\
         2. A brief description\n\
         3. 3-5 keywords or phrases\n\
         4. A confidence score between 0.0 and 1.0\n\
         5. A list of supporting document IDs\n",
    );

    if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
        prompt.push_str(&format!("\nFocus on themes related to: {}\n", q));
    }

    prompt.push_str(
        "\nFormat your response as a JSON array of theme objects with these fields:\n\
         - name: str\n\
         - description: str\n\
         - keywords: List[str]\n\
         - confidence: float (0.0-1.0)\n\
         - supporting_docs: List[{\"doc_id\": str, \"relevance\": float}]\n\
         \nDocuments:\n",
    );

    for doc in docs {
        let mut text: String = doc.text.chars().take(PROMPT_DOC_MAX_CHARS).collect();
        if doc.text.chars().count() > PROMPT_DOC_MAX_CHARS {
            text.push_str("... [truncated]");
        }
        prompt.push_str(&format!(
            "\nDocument ID: {}\nTitle: {}\nSource: {}\nType: {}\nUpload Date: {}\n\nContent:\n{}\n",
            doc.doc_id,
            if doc.title.is_empty() { "Untitled" } else { &doc.title },
            if doc.source.is_empty() { "Unknown" } else { &doc.source },
            doc.doc_type,
            doc.upload_date,
            text
        ));
    }

    prompt.push_str(&format!(
        "\nInstructions:\n\
         - Focus on recurring topics, concepts, and patterns\n\
         - Be specific and avoid generic themes\n\
         - Include only themes with strong supporting evidence\n\
         - Maximum {} themes\n\
         - Minimum confidence: {}\n\
         - Return only valid JSON, no other text\n",
        max_themes, min_confidence
    ));

    prompt
}

/// Parse themes from a model reply that may wrap JSON in prose.
///
/// A single object is treated as a one-element list. Entries that do not
/// deserialize as a [`Theme`] are skipped.
pub fn parse_themes(content: &str) -> Result<Vec<Theme>, ThemeError> {
    let start = content
        .find(['[', '{'])
        .ok_or_else(|| ThemeError::Parse("no JSON found in response".to_string()))?;
    let end = content
        .rfind([']', '}'])
        .filter(|&end| end > start)
        .ok_or_else(|| ThemeError::Parse("no JSON found in response".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| ThemeError::Parse(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        other => {
            return Err(ThemeError::Parse(format!("expected a list or object, got {}", other)))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Theme>(item) {
            Ok(theme) => Some(theme),
            Err(e) => {
                tracing::warn!(error = %e, "skipping invalid theme entry");
                None
            }
        })
        .collect())
}

/// Render a theme for the terminal.
pub fn format_theme(theme: &Theme) -> String {
    let docs: Vec<String> = theme
        .supporting_docs
        .iter()
        .take(DISPLAY_SUPPORTING_DOCS)
        .map(|d| match d.relevance {
            Some(r) => format!("  - {} (relevance: {:.2})", d.doc_id, r),
            None => format!("  - {}", d.doc_id),
        })
        .collect();

    let mut out = format!(
        "### {}\nConfidence: {:.1}%\n\n{}\n\nKeywords: {}\n\nSupporting documents:\n",
        theme.name,
        theme.confidence * 100.0,
        theme.description,
        theme.keywords.join(", ")
    );
    if docs.is_empty() {
        out.push_str("  No supporting documents\n");
    } else {
        out.push_str(&docs.join("\n"));
        out.push('\n');
    }
    out
}
