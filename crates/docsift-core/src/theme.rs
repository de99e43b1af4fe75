//! Theme data type and the data-infrastructure policy filter.
//!
//! Themes are produced by an external summarizer (see the `themes` module
//! of the application crate). The core only defines their shape and the
//! caller-owned post-filters applied on top of the summarizer's output.

use serde::{Deserialize, Deserializer, Serialize};

/// A document that supports a theme.
///
/// Deserializes from either `{"doc_id": ..., "relevance": ...}` or a bare
/// document id string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SupportingDocRepr")]
pub struct SupportingDoc {
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SupportingDocRepr {
    Id(String),
    Full {
        doc_id: String,
        #[serde(default, deserialize_with = "optional_lenient_f64")]
        relevance: Option<f64>,
    },
}

impl From<SupportingDocRepr> for SupportingDoc {
    fn from(repr: SupportingDocRepr) -> Self {
        match repr {
            SupportingDocRepr::Id(doc_id) => SupportingDoc {
                doc_id,
                relevance: None,
            },
            SupportingDocRepr::Full { doc_id, relevance } => SupportingDoc { doc_id, relevance },
        }
    }
}

/// A JSON number, or a string holding one (`"0.9"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            LenientNumber::Number(n) => Ok(n),
            LenientNumber::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected a number, got {:?}", s))),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    LenientNumber::deserialize(deserializer)?.into_f64()
}

fn optional_lenient_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Option::<LenientNumber>::deserialize(deserializer)?
        .map(LenientNumber::into_f64)
        .transpose()
}

/// A theme identified across a set of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// In `[0.0, 1.0]`.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(default)]
    pub supporting_docs: Vec<SupportingDoc>,
}

/// Names containing any of these are kept by [`apply_data_policy`].
pub const DATA_KEYWORDS: &[&str] = &[
    "data",
    "database",
    "sql",
    "nosql",
    "analytics",
    "pipeline",
    "storage",
    "etl",
    "warehouse",
    "stream",
    "kafka",
    "spark",
    "hadoop",
    "postgres",
    "mysql",
    "mongodb",
    "redis",
    "elasticsearch",
    "cassandra",
    "airflow",
];

/// Names mentioning any of these are dropped by [`apply_data_policy`].
pub const AI_TERMS: &[&str] = &[
    "machine learning",
    "deep learning",
    "artificial intelligence",
    "ai",
    "nlp",
    "model",
    "training",
    "inference",
    "computer vision",
];

/// Keep themes with `confidence >= min_confidence`, at most `max_themes`.
pub fn filter_by_confidence(themes: Vec<Theme>, min_confidence: f64, max_themes: usize) -> Vec<Theme> {
    themes
        .into_iter()
        .filter(|t| t.confidence >= min_confidence)
        .take(max_themes)
        .collect()
}

/// Restrict themes to data-infrastructure topics.
///
/// A theme is dropped when its name mentions an AI/ML term (matched on whole
/// words, so "maintenance" does not match "ai"). Of the rest, only themes
/// whose name contains a data keyword (substring match, so "streaming"
/// matches "stream") are kept.
pub fn apply_data_policy(themes: Vec<Theme>) -> Vec<Theme> {
    themes
        .into_iter()
        .filter(|t| !mentions_ai(&t.name) && mentions_data(&t.name))
        .collect()
}

fn mentions_data(name: &str) -> bool {
    let lower = name.to_lowercase();
    DATA_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn mentions_ai(name: &str) -> bool {
    let words: Vec<String> = name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    AI_TERMS.iter().any(|term| {
        let term_words: Vec<&str> = term.split(' ').collect();
        words
            .windows(term_words.len())
            .any(|window| window.iter().zip(&term_words).all(|(w, t)| w == t))
    })
}
