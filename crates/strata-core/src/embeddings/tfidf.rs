//! TF-IDF fallback embedder (§4.4), used when the neural backend is
//! unavailable (model download failed, `embeddings` feature not compiled).
//!
//! A pure hashing vectorizer rather than a growing vocabulary map: each
//! token hashes into one of [`TfIdfEmbedder::DIMENSIONS`] buckets, so the
//! output dimensionality never drifts as the corpus grows. Document
//! frequency per bucket is still tracked lazily as texts are seen, and used
//! for the IDF term — a lazily-built vocabulary of the existing corpus,
//! expressed without an unbounded vocabulary table that would otherwise
//! force a vector-index rebuild on every new term.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use super::{EmbeddingError, Result};

pub struct TfIdfEmbedder {
    /// document_count, per-bucket document frequency
    state: Mutex<TfIdfState>,
}

struct TfIdfState {
    document_count: u64,
    bucket_doc_freq: Vec<u64>,
}

impl TfIdfEmbedder {
    pub const DIMENSIONS: usize = 1024;

    pub fn new() -> Self {
        Self {
            state: Mutex::new(TfIdfState {
                document_count: 0,
                bucket_doc_freq: vec![0; Self::DIMENSIONS],
            }),
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn bucket(token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % Self::DIMENSIONS
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let tokens = Self::tokenize(text);
        let mut term_freq = vec![0u32; Self::DIMENSIONS];
        for token in &tokens {
            term_freq[Self::bucket(token)] += 1;
        }

        let mut state = self.state.lock().expect("tfidf state poisoned");
        state.document_count += 1;
        let buckets_present: Vec<usize> = term_freq
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, _)| i)
            .collect();
        for bucket in &buckets_present {
            state.bucket_doc_freq[*bucket] += 1;
        }

        let doc_count = state.document_count as f32;
        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for bucket in 0..Self::DIMENSIONS {
            if term_freq[bucket] == 0 {
                continue;
            }
            let tf = term_freq[bucket] as f32 / tokens.len().max(1) as f32;
            let df = state.bucket_doc_freq[bucket] as f32;
            let idf = (doc_count / df.max(1.0)).ln() + 1.0;
            vector[bucket] = tf * idf;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

impl Default for TfIdfEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_produces_fixed_dimensionality() {
        let embedder = TfIdfEmbedder::new();
        let v = embedder.embed("hello world hello rust").unwrap();
        assert_eq!(v.len(), TfIdfEmbedder::DIMENSIONS);
    }

    #[test]
    fn rejects_empty_input() {
        let embedder = TfIdfEmbedder::new();
        assert!(matches!(embedder.embed("   "), Err(EmbeddingError::EmptyInput)));
    }

    #[test]
    fn output_is_unit_normalized() {
        let embedder = TfIdfEmbedder::new();
        let v = embedder.embed("alpha beta gamma alpha").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn repeated_terms_across_corpus_reduce_idf_weight() {
        let embedder = TfIdfEmbedder::new();
        // seed document frequency for "common" across many docs
        for _ in 0..20 {
            embedder.embed("common filler text here").unwrap();
        }
        let v = embedder.embed("common rare-term-xyz").unwrap();
        let common_bucket = TfIdfEmbedder::bucket("common");
        let rare_bucket = TfIdfEmbedder::bucket("rare-term-xyz");
        if common_bucket != rare_bucket {
            assert!(v[rare_bucket] >= v[common_bucket]);
        }
    }
}
