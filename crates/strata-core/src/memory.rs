//! Memory façade (C10): the single write entry point composing identity
//! (C1), the store (C2), the embedder (C4), the vector index (C3), and the
//! graph API (C5) under one transactional call.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::config::StrataConfig;
use crate::embeddings::EmbeddingService;
use crate::graph::{self, GraphApi};
use crate::identity;
use crate::model::{Edge, EdgeType, Properties};
use crate::storage::{Store, StoreError};
use crate::vector::{VectorIndex, VectorIndexConfig};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MemoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// The top-level handle for a project's memory store. Owns the store, vector
/// index, and embedding service, and is the type every public operation in
/// this crate (`add_memory`, `recall`, `sleep`, cognitive maintenance) is
/// implemented against, split across the modules that own each concern.
pub struct Strata {
    pub(crate) store: Store,
    pub(crate) vector_index: Mutex<VectorIndex>,
    pub(crate) embeddings: EmbeddingService,
    pub(crate) config: StrataConfig,
}

impl Strata {
    pub fn open(config: StrataConfig) -> Result<Self> {
        let store = Store::open(&config)?;
        let embeddings = EmbeddingService::new(&config);
        let vector_dir = store.store_dir().join("chroma");
        let vector_index = VectorIndex::open(
            vector_dir,
            VectorIndexConfig { dimensions: embeddings.dimensions() },
        )
        .map_err(|e| MemoryError::Store(StoreError::InvariantViolation(e.to_string())))?;
        Ok(Self {
            store,
            vector_index: Mutex::new(vector_index),
            embeddings,
            config,
        })
    }

    /// In-memory store with no on-disk artifacts, for tests.
    pub fn open_in_memory(config: StrataConfig) -> Result<Self> {
        let store = Store::open_in_memory()?;
        let embeddings = EmbeddingService::new(&config);
        let dir = std::env::temp_dir().join(format!("strata-test-{}", uuid::Uuid::new_v4()));
        let vector_index = VectorIndex::open(
            dir,
            VectorIndexConfig { dimensions: embeddings.dimensions() },
        )
        .map_err(|e| MemoryError::Store(StoreError::InvariantViolation(e.to_string())))?;
        Ok(Self {
            store,
            vector_index: Mutex::new(vector_index),
            embeddings,
            config,
        })
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn graph(&self) -> GraphApi<'_> {
        GraphApi::new(&self.store)
    }

    /// Single write entry point (§4.10). Computes (or accepts) the node id,
    /// upserts it, wires structural edges, and generates/stores an embedding.
    /// Embedding failure is non-fatal: the node is kept without a vector and
    /// a warning is logged (§4.10 step 4, §7 class 4).
    #[allow(clippy::too_many_arguments)]
    pub fn add_memory(
        &self,
        title: &str,
        content: &str,
        labels: &[&str],
        properties: Option<Properties>,
        author: Option<&str>,
        references: Option<&[String]>,
        node_id: Option<String>,
    ) -> Result<String> {
        let id = node_id.unwrap_or_else(|| identity::node_id(title, labels));
        let label_set: BTreeSet<String> = labels.iter().map(|s| s.to_string()).collect();
        let properties = properties.unwrap_or_default();

        self.store
            .upsert_node(&id, title, content, &label_set, &properties, false)?;

        if let Some(author) = author {
            let person_id = identity::node_id(author, &["Person"]);
            let person_labels: BTreeSet<String> = ["Person".to_string()].into_iter().collect();
            self.store
                .upsert_node(&person_id, author, "", &person_labels, &Properties::new(), false)?;
            self.store
                .add_edge(&Edge::new(id.clone(), person_id, EdgeType::AuthoredBy))?;
        }

        if let Some(domain) = properties.get("domain").and_then(|v| v.as_str()) {
            let domain_id = identity::node_id(domain, &["Concept", "Domain"]);
            let domain_labels: BTreeSet<String> =
                ["Concept".to_string(), "Domain".to_string()].into_iter().collect();
            self.store
                .upsert_node(&domain_id, domain, "", &domain_labels, &Properties::new(), false)?;
            self.store
                .add_edge(&Edge::new(id.clone(), domain_id, EdgeType::BelongsTo))?;
        }

        if let Some(references) = references {
            for reference in references {
                if let Some(target_id) = graph::resolve_reference(&self.store, reference)? {
                    self.store
                        .add_edge(&Edge::new(id.clone(), target_id, EdgeType::References))?;
                } else {
                    tracing::warn!(reference, "explicit reference did not resolve to any node");
                }
            }
        }

        let text = EmbeddingService::node_text(title, content, &self.config);
        match self.embeddings.embed(&text) {
            Ok(vector) => {
                let mut index = self.vector_index.lock().expect("vector index mutex poisoned");
                if let Err(e) = index.upsert(&id, &vector) {
                    tracing::warn!(node_id = %id, error = %e, "failed to upsert embedding into vector index");
                }
            }
            Err(e) => {
                tracing::warn!(node_id = %id, error = %e, "embedding generation failed, node stored without a vector");
            }
        }

        Ok(id)
    }
}
