//! Primary embedding backend: a local sentence-transformer-style ONNX model
//! via `fastembed`, loaded lazily and shared process-wide (§4.4, §9 "global
//! state").

use std::sync::OnceLock;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbeddingError, Result};

/// Output dimensionality of the default model (§4.4: "384-dimensional vectors").
pub const EMBEDDING_DIMENSIONS: usize = 384;

const BATCH_SIZE: usize = 32;

static MODEL: OnceLock<std::sync::Mutex<TextEmbedding>> = OnceLock::new();

fn get_model() -> Result<&'static std::sync::Mutex<TextEmbedding>> {
    if let Some(model) = MODEL.get() {
        return Ok(model);
    }
    let init = InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false);
    let model = TextEmbedding::try_new(init).map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;
    Ok(MODEL.get_or_init(|| std::sync::Mutex::new(model)))
}

pub struct NeuralEmbedder;

impl NeuralEmbedder {
    /// Attempts to initialize the singleton model; returns an error rather
    /// than constructing the struct if it can't load, so callers can fall
    /// back to TF-IDF per §4.4/§7 class 4.
    pub fn try_init() -> Result<Self> {
        get_model()?;
        Ok(Self)
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = get_model()?;
        let mut guard = model.lock().expect("embedding model mutex poisoned");
        let mut out = guard
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        out.pop().ok_or_else(|| EmbeddingError::Inference("empty embedding result".into()))
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = get_model()?;
        let mut guard = model.lock().expect("embedding model mutex poisoned");
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let batch = guard
                .embed(chunk.to_vec(), None)
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
            out.extend(batch);
        }
        Ok(out)
    }

    pub fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}
