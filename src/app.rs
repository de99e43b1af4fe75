//! Service wiring.
//!
//! [`App`] owns every long-lived service. Commands and tests receive it by
//! reference; nothing is global.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::index::EmbeddingIndex;
use crate::processor::DocumentProcessor;
use crate::themes::{OpenAiThemeSummarizer, ThemeSummarizer};

pub struct App {
    pub config: Config,
    pub processor: Arc<DocumentProcessor>,
    pub index: Arc<EmbeddingIndex>,
    pub summarizer: Option<Arc<dyn ThemeSummarizer>>,
}

impl App {
    pub fn new(
        config: Config,
        processor: Arc<DocumentProcessor>,
        index: Arc<EmbeddingIndex>,
        summarizer: Option<Arc<dyn ThemeSummarizer>>,
    ) -> Self {
        Self {
            config,
            processor,
            index,
            summarizer,
        }
    }

    /// Build the configured services and open the index.
    ///
    /// Themes stay off when enabled without an API key; that is logged, not fatal.
    pub async fn from_config(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = EmbeddingIndex::open(&config.index, embedder).await?;
        let processor = DocumentProcessor::from_config(&config.ocr);

        let summarizer: Option<Arc<dyn ThemeSummarizer>> = if config.themes.enabled {
            match OpenAiThemeSummarizer::new(&config.themes) {
                Ok(s) => Some(Arc::new(s)),
                Err(e) => {
                    tracing::warn!(error = %e, "theme extraction disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(
            config,
            Arc::new(processor),
            Arc::new(index),
            summarizer,
        ))
    }
}
