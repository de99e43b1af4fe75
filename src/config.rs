//! TOML configuration.
//!
//! Every section has defaults, so a config file only needs the keys it wants
//! to change. [`load_config`] parses and validates; validation failures are
//! reported with the offending key name.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub themes: ThemesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
            collection: default_collection(),
        }
    }
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("./data/vector_db")
}
fn default_collection() -> String {
    "document_chunks".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "hashed".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Default model name for the `hashed` provider.
pub const HASHED_MODEL: &str = "hashed-bow-v1";
/// Default dimensionality for the `hashed` provider.
pub const HASHED_DIMS: usize = 256;

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_n_results() -> usize {
    10
}
fn default_snippet_chars() -> usize {
    docsift_core::rank::SNIPPET_MAX_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Extraction worker count. Defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: None,
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn default_include_globs() -> Vec<String> {
    [
        "**/*.pdf", "**/*.docx", "**/*.pptx", "**/*.txt", "**/*.jpg", "**/*.jpeg", "**/*.png",
        "**/*.tif", "**/*.tiff",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,
    #[serde(default = "default_pdftoppm_cmd")]
    pub pdftoppm_cmd: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: default_tesseract_cmd(),
            pdftoppm_cmd: default_pdftoppm_cmd(),
            dpi: default_dpi(),
            language: default_language(),
        }
    }
}

fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}
fn default_pdftoppm_cmd() -> String {
    "pdftoppm".to_string()
}
fn default_dpi() -> u32 {
    200
}
fn default_language() -> String {
    "eng".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_theme_model")]
    pub model: String,
    #[serde(default = "default_max_themes")]
    pub max_themes: usize,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_theme_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for ThemesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_theme_model(),
            max_themes: default_max_themes(),
            min_confidence: default_min_confidence(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_theme_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

fn default_theme_model() -> String {
    "gpt-4-turbo-preview".to_string()
}
fn default_max_themes() -> usize {
    5
}
fn default_min_confidence() -> f64 {
    0.7
}
fn default_max_attempts() -> u32 {
    3
}
fn default_theme_timeout_secs() -> u64 {
    60
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Config {
    /// Path of the SQLite file inside the persist directory.
    pub fn db_path(&self) -> PathBuf {
        self.index.persist_dir.join("index.sqlite")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate retrieval
    if config.retrieval.n_results < 1 {
        anyhow::bail!("retrieval.n_results must be >= 1");
    }
    if config.retrieval.snippet_chars < 1 {
        anyhow::bail!("retrieval.snippet_chars must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "hashed" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashed, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate ingest
    if config.ingest.workers == Some(0) {
        anyhow::bail!("ingest.workers must be >= 1");
    }

    // Validate themes
    if !(0.0..=1.0).contains(&config.themes.min_confidence) {
        anyhow::bail!("themes.min_confidence must be in [0.0, 1.0]");
    }
    if config.themes.max_attempts < 1 {
        anyhow::bail!("themes.max_attempts must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.retrieval.n_results, 10);
        assert_eq!(config.retrieval.snippet_chars, 500);
        assert_eq!(config.themes.max_attempts, 3);
        assert!(!config.themes.enabled);
        assert!(config.db_path().ends_with("vector_db/index.sqlite"));
        assert!(config.ingest.worker_count() >= 1);
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let err = parse("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));

        let err = parse("[embedding]\nprovider = \"openai\"\ndims = 1536\n").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));

        parse("[embedding]\nprovider = \"openai\"\ndims = 1536\nmodel = \"text-embedding-3-small\"\n")
            .unwrap();
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse("[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse("[retrieval]\nn_results = 0\n").is_err());
        assert!(parse("[ingest]\nworkers = 0\n").is_err());
        assert!(parse("[themes]\nmin_confidence = 1.5\n").is_err());
        assert!(parse("[themes]\nmax_attempts = 0\n").is_err());
    }
}
