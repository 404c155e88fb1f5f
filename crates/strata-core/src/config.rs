//! Tunable defaults, gathered into a single struct rather than scattered
//! constants, so a caller can override any of them without reaching into
//! internal modules. Every field here corresponds to a knob §9 explicitly
//! calls out as an empirically-picked, should-be-configurable value, plus
//! the store path override.

use std::path::PathBuf;

/// Environment variable consulted by [`StrataConfig::resolve_store_path`]
/// when the caller doesn't pass an explicit path. Narrow and documented
/// rather than a sprawl of `STRATA_*` settings.
pub const STORE_PATH_ENV_VAR: &str = "STRATA_DB_PATH";

/// Runtime configuration for a [`crate::Strata`] instance.
///
/// Constructed via [`StrataConfig::default`] and overridden field-by-field;
/// there is no environment-driven magic beyond [`STORE_PATH_ENV_VAR`] and the
/// store path resolution rule (§9).
#[derive(Debug, Clone)]
pub struct StrataConfig {
    /// Explicit store directory. When `None`, resolution falls back to
    /// [`STORE_PATH_ENV_VAR`] and then to a platform-appropriate directory —
    /// never to the process's current working directory, which is the
    /// "ghost database" failure mode §9 warns about.
    pub store_path: Option<PathBuf>,

    // --- Recall (C7) ---
    /// Default `top` result count.
    pub recall_top_default: usize,
    /// Number of top semantic seeds fed into spreading activation (§4.7 step 3).
    pub recall_spread_seeds: usize,
    /// Default spreading-activation depth (hops).
    pub recall_depth_default: u32,
    /// Per-hop decay multiplier for spreading activation.
    pub spread_decay: f64,
    /// Hard cap on nodes visited during a single `spread` call (§4.5, §5).
    pub spread_max_nodes: usize,
    /// Type-match boost multiplier applied in the type-priority step (§4.7 step 4).
    pub type_boost: f64,
    /// Number of summarized connections attached per result (§4.7 step 7).
    pub connections_per_result: usize,
    /// Reinforcement multiplier applied to `strength` on recall (§4.7 step 6).
    pub reinforcement_factor: f64,
    /// Summary length, in characters, for compact-mode payloads (§4.7 step 8).
    pub summary_chars: usize,

    // --- CO_ACCESSED edges (§9 Open Question c) ---
    /// Starting weight for a newly created `CO_ACCESSED` edge.
    pub co_accessed_initial_weight: f32,
    /// Weight added per additional co-access.
    pub co_accessed_increment: f32,
    /// Upper bound a `CO_ACCESSED` edge's weight saturates at.
    pub co_accessed_max_weight: f32,
    /// How many top results are pairwise linked by `CO_ACCESSED` edges per
    /// recall call, bounding the O(n²) pairing (§4.7 step 6).
    pub co_accessed_pairing_cap: usize,

    // --- Sleep / RELATE phase (§9 Open Question b) ---
    /// Minimum cosine similarity for a `RELATED_TO` edge.
    pub relate_similarity_threshold: f64,
    /// Maximum nodes sampled per label stratum.
    pub relate_stratum_cap: usize,
    /// Hard cap on total pairwise comparisons during RELATE.
    pub relate_comparison_cap: usize,
    /// Deterministic seed for RELATE's stratified sampling.
    pub relate_sample_seed: u64,

    // --- Sleep / CONNECT phase ---
    /// Cap on pairs produced per `MODIFIES_SAME` file bucket.
    pub connect_modifies_same_cap: usize,

    // --- Sleep / THEMES phase ---
    /// Minimum commits sharing a scope before a `Theme` node is created.
    pub themes_min_commits: usize,

    // --- Sleep / CALIBRATE phase ---
    /// Edges whose endpoints were last accessed longer ago than this (days)
    /// are eligible for calibration decay.
    pub calibrate_stale_after_days: i64,

    // --- Ingest (C6) ---
    /// Max commits ingested on an initial populate run.
    pub commits_initial_cap: usize,
    /// Max commits ingested on a refresh run.
    pub commits_refresh_cap: usize,

    // --- Cognitive maintenance (C9) ---
    /// Strength threshold below which a node gains the `WeakMemory` label.
    pub weak_memory_threshold: f64,
    /// Strength threshold below which a node becomes an archival candidate.
    pub archive_threshold: f64,
    /// Days a node must stay below [`Self::archive_threshold`] before
    /// archival is proposed (§3 Lifecycle, §9 Open Question a).
    pub archive_after_days: i64,

    // --- Embeddings / vector index ---
    /// Characters of `"title\ncontent"` fed to the embedder (§4.4).
    pub embedding_input_chars: usize,
    /// LRU capacity for the recall query-embedding cache.
    pub query_cache_capacity: usize,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            store_path: None,

            recall_top_default: 10,
            recall_spread_seeds: 5,
            recall_depth_default: 2,
            spread_decay: 0.5,
            spread_max_nodes: 200,
            type_boost: 1.1,
            connections_per_result: 5,
            reinforcement_factor: 1.05,
            summary_chars: 200,

            co_accessed_initial_weight: 0.4,
            co_accessed_increment: 0.05,
            co_accessed_max_weight: 1.0,
            co_accessed_pairing_cap: 5,

            relate_similarity_threshold: 0.75,
            relate_stratum_cap: 500,
            relate_comparison_cap: 50_000,
            relate_sample_seed: 0x5352_4154, // "STRA" — arbitrary, fixed for determinism

            connect_modifies_same_cap: 20,

            themes_min_commits: 3,

            calibrate_stale_after_days: 90,

            commits_initial_cap: 7000,
            commits_refresh_cap: 20,

            weak_memory_threshold: 0.3,
            archive_threshold: 0.1,
            archive_after_days: 30,

            embedding_input_chars: 1000,
            query_cache_capacity: 100,
        }
    }
}

impl StrataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Resolves the store directory in priority order: explicit
    /// [`Self::store_path`], then [`STORE_PATH_ENV_VAR`], then a
    /// platform-appropriate data directory via `directories`. The caller's
    /// current working directory is never consulted (§9 "ghost database").
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        if let Ok(from_env) = std::env::var(STORE_PATH_ENV_VAR) {
            return PathBuf::from(from_env);
        }
        directories::ProjectDirs::from("", "", "strata")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".strata"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_env_and_default() {
        let cfg = StrataConfig::new().with_store_path("/tmp/explicit-store");
        assert_eq!(cfg.resolve_store_path(), PathBuf::from("/tmp/explicit-store"));
    }

    #[test]
    fn defaults_match_spec_values() {
        let cfg = StrataConfig::default();
        assert_eq!(cfg.spread_decay, 0.5);
        assert_eq!(cfg.spread_max_nodes, 200);
        assert_eq!(cfg.relate_similarity_threshold, 0.75);
        assert_eq!(cfg.relate_stratum_cap, 500);
        assert_eq!(cfg.relate_comparison_cap, 50_000);
        assert_eq!(cfg.co_accessed_initial_weight, 0.4);
        assert_eq!(cfg.co_accessed_increment, 0.05);
        assert_eq!(cfg.co_accessed_max_weight, 1.0);
        assert_eq!(cfg.commits_initial_cap, 7000);
        assert_eq!(cfg.commits_refresh_cap, 20);
    }
}
