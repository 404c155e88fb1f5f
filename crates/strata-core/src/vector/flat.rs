//! Brute-force flat scan (§4.3 fallback policy): correct, O(n) per query,
//! used whenever the HNSW backend is unavailable or not compiled in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::NodeId;

use super::{cosine_distance, Result, VectorBackend, VectorIndexConfig, VectorIndexError};

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    dimensions: usize,
    vectors: Vec<(String, Vec<f32>)>,
}

pub struct FlatIndex {
    dimensions: usize,
    vectors: HashMap<NodeId, Vec<f32>>,
    snapshot_path: PathBuf,
}

impl FlatIndex {
    pub fn open(dir: &Path, config: VectorIndexConfig) -> Result<Self> {
        let snapshot_path = dir.join("flat.json");
        let mut index = Self {
            dimensions: config.dimensions,
            vectors: HashMap::new(),
            snapshot_path,
        };
        index.load()?;
        Ok(index)
    }

    fn load(&mut self) -> Result<()> {
        if !self.snapshot_path.exists() {
            return Ok(());
        }
        let data = std::fs::read_to_string(&self.snapshot_path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&data).map_err(|e| VectorIndexError::Serialization(e.to_string()))?;
        self.dimensions = snapshot.dimensions;
        self.vectors = snapshot.vectors.into_iter().collect();
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let snapshot = Snapshot {
            dimensions: self.dimensions,
            vectors: self.vectors.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        let data =
            serde_json::to_string(&snapshot).map_err(|e| VectorIndexError::Serialization(e.to_string()))?;
        std::fs::write(&self.snapshot_path, data)?;
        Ok(())
    }
}

impl VectorBackend for FlatIndex {
    fn upsert(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        if self.vectors.is_empty() && self.dimensions == 0 {
            self.dimensions = vector.len();
        }
        self.vectors.insert(id.to_string(), vector.to_vec());
        self.persist()
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.vectors.remove(id);
        self.persist()
    }

    fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(NodeId, f32)>> {
        let mut scored: Vec<(NodeId, f32)> = self
            .vectors
            .iter()
            .map(|(id, v)| (id.clone(), cosine_distance(vector, v)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
