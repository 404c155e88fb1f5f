//! Text → fixed-dimensional vector, with an automatic fallback path (C4).

#[cfg(feature = "embeddings")]
mod neural;
mod tfidf;

#[cfg(feature = "embeddings")]
pub use neural::{NeuralEmbedder, EMBEDDING_DIMENSIONS};
pub use tfidf::TfIdfEmbedder;

use std::sync::Mutex;

use lru::LruCache;

use crate::config::StrataConfig;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EmbeddingError {
    /// §7 class 4: neural model unavailable.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("cannot embed empty input")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderBackend {
    Neural,
    TfIdf,
}

impl EmbedderBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedderBackend::Neural => "neural",
            EmbedderBackend::TfIdf => "tfidf",
        }
    }
}

enum ActiveEmbedder {
    #[cfg(feature = "embeddings")]
    Neural(NeuralEmbedder),
    TfIdf(TfIdfEmbedder),
}

/// Owns the active embedding backend and a query-embedding cache (§2
/// "Supplemented features": avoids re-embedding repeated recall queries).
pub struct EmbeddingService {
    active: ActiveEmbedder,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingService {
    /// Tries the neural backend first (when compiled in); falls back to
    /// TF-IDF on any initialization failure, logging a warning rather than
    /// failing the caller (§4.4, §7 class 4).
    pub fn new(config: &StrataConfig) -> Self {
        #[cfg(feature = "embeddings")]
        {
            match NeuralEmbedder::try_init() {
                Ok(neural) => {
                    return Self {
                        active: ActiveEmbedder::Neural(neural),
                        cache: Mutex::new(LruCache::new(
                            std::num::NonZeroUsize::new(config.query_cache_capacity.max(1)).unwrap(),
                        )),
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "neural embedding backend unavailable, falling back to tf-idf");
                }
            }
        }
        Self {
            active: ActiveEmbedder::TfIdf(TfIdfEmbedder::new()),
            cache: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(config.query_cache_capacity.max(1)).unwrap(),
            )),
        }
    }

    pub fn backend(&self) -> EmbedderBackend {
        match &self.active {
            #[cfg(feature = "embeddings")]
            ActiveEmbedder::Neural(_) => EmbedderBackend::Neural,
            ActiveEmbedder::TfIdf(_) => EmbedderBackend::TfIdf,
        }
    }

    pub fn dimensions(&self) -> usize {
        match &self.active {
            #[cfg(feature = "embeddings")]
            ActiveEmbedder::Neural(n) => n.dimensions(),
            ActiveEmbedder::TfIdf(_) => TfIdfEmbedder::DIMENSIONS,
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.active {
            #[cfg(feature = "embeddings")]
            ActiveEmbedder::Neural(n) => n.embed(text),
            ActiveEmbedder::TfIdf(t) => t.embed(text),
        }
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.active {
            #[cfg(feature = "embeddings")]
            ActiveEmbedder::Neural(n) => n.embed_batch(texts),
            ActiveEmbedder::TfIdf(t) => texts.iter().map(|text| t.embed(text)).collect(),
        }
    }

    /// Builds the `"title\ncontent"` embedding input (§4.4), truncated to
    /// `config.embedding_input_chars`.
    pub fn node_text(title: &str, content: &str, config: &StrataConfig) -> String {
        let combined = format!("{title}\n{content}");
        combined.chars().take(config.embedding_input_chars).collect()
    }

    /// Embeds a recall query, reusing a cached vector for repeated queries
    /// within the process's lifetime.
    pub fn embed_query_cached(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.lock().expect("query cache poisoned").get(query).cloned() {
            return Ok(hit);
        }
        let vector = self.embed(query)?;
        self.cache
            .lock()
            .expect("query cache poisoned")
            .put(query.to_string(), vector.clone());
        Ok(vector)
    }
}
