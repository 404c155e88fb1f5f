//! HNSW approximate nearest-neighbor backend via `usearch` (§4.3 primary
//! backend). `usearch` keys vectors by `u64`; we maintain a bidirectional
//! map between those keys and node ids and persist it alongside the index
//! file so a reopen doesn't lose the mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::model::NodeId;

use super::{Result, VectorBackend, VectorIndexConfig, VectorIndexError};

#[derive(Serialize, Deserialize, Default)]
struct KeyMap {
    id_to_key: HashMap<NodeId, u64>,
    key_to_id: HashMap<u64, NodeId>,
    next_key: u64,
}

pub struct HnswIndex {
    index: Index,
    dimensions: usize,
    keys: KeyMap,
    next_key: AtomicU64,
    index_path: PathBuf,
    keymap_path: PathBuf,
}

impl HnswIndex {
    pub fn open(dir: &Path, config: VectorIndexConfig) -> Result<Self> {
        let index_path = dir.join("index.usearch");
        let keymap_path = dir.join("index.keymap.json");

        let options = IndexOptions {
            dimensions: config.dimensions.max(1),
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            ..Default::default()
        };
        let index = Index::new(&options).map_err(|e| VectorIndexError::Backend(e.to_string()))?;
        index
            .reserve(1024)
            .map_err(|e| VectorIndexError::Backend(e.to_string()))?;

        if index_path.exists() {
            index
                .load(index_path.to_string_lossy().as_ref())
                .map_err(|e| VectorIndexError::Backend(e.to_string()))?;
        }

        let keys: KeyMap = if keymap_path.exists() {
            let data = std::fs::read_to_string(&keymap_path)?;
            serde_json::from_str(&data).map_err(|e| VectorIndexError::Serialization(e.to_string()))?
        } else {
            KeyMap::default()
        };
        let next_key = AtomicU64::new(keys.next_key);

        Ok(Self {
            index,
            dimensions: config.dimensions,
            keys,
            next_key,
            index_path,
            keymap_path,
        })
    }

    fn persist(&self) -> Result<()> {
        self.index
            .save(self.index_path.to_string_lossy().as_ref())
            .map_err(|e| VectorIndexError::Backend(e.to_string()))?;
        let data = serde_json::to_string(&self.keys).map_err(|e| VectorIndexError::Serialization(e.to_string()))?;
        std::fs::write(&self.keymap_path, data)?;
        Ok(())
    }
}

impl VectorBackend for HnswIndex {
    fn upsert(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        if self.keys.id_to_key.is_empty() && self.dimensions == 0 {
            self.dimensions = vector.len();
        }
        if let Some(&key) = self.keys.id_to_key.get(id) {
            let _ = self.index.remove(key);
        }
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        self.index
            .add(key, vector)
            .map_err(|e| VectorIndexError::Backend(e.to_string()))?;
        self.keys.id_to_key.insert(id.to_string(), key);
        self.keys.key_to_id.insert(key, id.to_string());
        self.keys.next_key = self.next_key.load(Ordering::SeqCst);
        self.persist()
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        if let Some(key) = self.keys.id_to_key.remove(id) {
            self.keys.key_to_id.remove(&key);
            let _ = self.index.remove(key);
            self.persist()?;
        }
        Ok(())
    }

    fn contains(&self, id: &str) -> bool {
        self.keys.id_to_key.contains_key(id)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(NodeId, f32)>> {
        let matches = self
            .index
            .search(vector, k)
            .map_err(|e| VectorIndexError::Backend(e.to_string()))?;
        Ok(matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .filter_map(|(key, dist)| self.keys.key_to_id.get(key).map(|id| (id.clone(), *dist)))
            .collect())
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
