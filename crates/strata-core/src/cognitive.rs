//! Cognitive maintenance (C9): per-day exponential strength decay, weak/archive
//! labeling, and a composite health score with actionable recommendations
//! (§4.9). Decay and archival are invoked from the sleep engine's DECAY
//! phase; health is callable standalone for diagnostics.

use chrono::Utc;
use serde::Serialize;

use crate::memory::Strata;
use crate::model::{EdgeType, PrimaryLabel, Properties};
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CognitiveError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CognitiveError>;

const SEMANTIC_EDGE_TYPES: &[EdgeType] = &[
    EdgeType::References,
    EdgeType::RelatedTo,
    EdgeType::InformedBy,
    EdgeType::Applies,
    EdgeType::SameScope,
    EdgeType::ModifiesSame,
    EdgeType::BelongsToTheme,
];

/// Outcome of one [`apply_decay`] pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecayOutcome {
    pub decayed: usize,
    pub newly_weak: usize,
    pub archived: usize,
}

/// Applies exponential decay to every node's `strength`, labels nodes below
/// the weak threshold, and archives ones that have stayed below the archive
/// threshold for at least `archive_after_days` (§4.9 "Decay"/"Archive").
pub fn apply_decay(strata: &Strata) -> Result<DecayOutcome> {
    let config = strata.config();
    let now = Utc::now();
    let mut outcome = DecayOutcome::default();

    for node in strata.store().all_nodes()? {
        if node.is_archived() {
            continue;
        }
        let last_accessed = node
            .properties
            .get("last_accessed")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(node.updated_at);
        let elapsed_days = (now - last_accessed).num_seconds() as f64 / 86_400.0;
        if elapsed_days <= 0.0 {
            continue;
        }

        let decay_rate = node.primary_label().decay_rate();
        let decayed_strength = node.strength() * (-decay_rate * elapsed_days).exp();

        let mut properties = Properties::new();
        properties.insert("strength".to_string(), serde_json::json!(decayed_strength.clamp(0.0, 1.0)));
        strata.store().update_node_content(&node.id, None, &properties)?;
        outcome.decayed += 1;

        let mut labels = node.labels.clone();
        if decayed_strength < config.weak_memory_threshold && !node.is_weak() {
            labels.insert("WeakMemory".to_string());
            outcome.newly_weak += 1;
        }

        if decayed_strength < config.archive_threshold {
            let below_since = node
                .properties
                .get("below_archive_threshold_since")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            match below_since {
                Some(since) if (now - since).num_days() >= config.archive_after_days => {
                    labels.insert("Archived".to_string());
                    outcome.archived += 1;
                }
                Some(_) => {}
                None => {
                    properties.insert("below_archive_threshold_since".to_string(), serde_json::json!(now.to_rfc3339()));
                }
            }
        } else if node.properties.contains_key("below_archive_threshold_since") {
            properties.insert("below_archive_threshold_since".to_string(), serde_json::Value::Null);
        }

        if labels != node.labels {
            strata.store().upsert_node(&node.id, &node.title, &node.content, &labels, &properties, true)?;
        }
    }

    Ok(outcome)
}

/// Code-coverage counts, one of [`HealthReport`]'s extra sections (§4.9).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeCoverage {
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub interfaces: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffEnrichmentCoverage {
    pub total_commits: usize,
    pub enriched: usize,
    pub ratio: f64,
}

/// A single actionable health finding. Structured rather than a bare string
/// so a caller can filter or render by `category` without parsing prose.
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecommendation {
    pub category: &'static str,
    pub message: String,
}

impl HealthRecommendation {
    fn new(category: &'static str, message: impl Into<String>) -> Self {
        Self { category, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub score: f64,
    pub weak_ratio: f64,
    pub semantic_connectivity: f64,
    pub embedding_coverage: f64,
    pub code_coverage: CodeCoverage,
    pub diff_enrichment: DiffEnrichmentCoverage,
    pub vector_backend: &'static str,
    pub embedder_backend: &'static str,
    pub recommendations: Vec<HealthRecommendation>,
}

/// Computes the composite health score and its diagnostic sections (§4.9
/// "Health").
pub fn health(strata: &Strata) -> Result<HealthReport> {
    let nodes = strata.store().all_nodes()?;
    let total = nodes.len().max(1);

    let weak_count = nodes.iter().filter(|n| n.is_weak() && !n.is_archived()).count();
    let weak_ratio = weak_count as f64 / total as f64;

    let mut with_semantic_edge = 0usize;
    for node in &nodes {
        let has_semantic = SEMANTIC_EDGE_TYPES.iter().any(|&edge_type| {
            strata
                .graph()
                .neighbors(&node.id, crate::model::Direction::Both, Some(&[edge_type]))
                .map(|neighbors| !neighbors.is_empty())
                .unwrap_or(false)
        });
        if has_semantic {
            with_semantic_edge += 1;
        }
    }
    let semantic_connectivity = with_semantic_edge as f64 / total as f64;

    let index = strata.vector_index.lock().expect("vector index mutex poisoned");
    let embedded = nodes.iter().filter(|n| index.contains(&n.id)).count();
    let embedding_coverage = embedded as f64 / total as f64;
    let vector_backend = match index.backend_kind() {
        crate::vector::BackendKind::Ann => "ann",
        crate::vector::BackendKind::Flat => "flat",
    };
    drop(index);

    let code_coverage = CodeCoverage {
        modules: strata.store().find_by_label("Module")?.len(),
        classes: strata.store().find_by_label("Class")?.len(),
        functions: strata.store().find_by_label("Function")?.len(),
        interfaces: strata.store().find_by_label("Interface")?.len(),
    };

    let commits = strata.store().find_by_label("Commit")?;
    let enriched = commits.iter().filter(|c| c.properties.contains_key("diff_enriched_at")).count();
    let diff_enrichment = DiffEnrichmentCoverage {
        total_commits: commits.len(),
        enriched,
        ratio: if commits.is_empty() { 0.0 } else { enriched as f64 / commits.len() as f64 },
    };

    let score = 0.3 * (1.0 - weak_ratio) + 0.4 * semantic_connectivity + 0.3 * embedding_coverage;

    let mut recommendations = Vec::new();
    if semantic_connectivity < 0.5 {
        recommendations.push(HealthRecommendation::new(
            "connectivity",
            "run sleep to rebuild cross-references and relatedness edges",
        ));
    }
    if code_coverage.modules == 0 {
        recommendations.push(HealthRecommendation::new("code_coverage", "populate AST to add code structure"));
    }
    if diff_enrichment.ratio < 0.5 && !commits.is_empty() {
        recommendations.push(HealthRecommendation::new("diff_enrichment", "enrich diffs for recent commits"));
    }
    if embedding_coverage < 0.9 {
        recommendations.push(HealthRecommendation::new(
            "embedding_coverage",
            "regenerate embeddings for unembedded nodes",
        ));
    }
    if weak_ratio > 0.3 {
        recommendations.push(HealthRecommendation::new("weak_memory", "review weak memories for archival"));
    }
    if vector_backend == "flat" {
        recommendations.push(HealthRecommendation::new(
            "vector_backend",
            "install the ANN backend (vector-search feature) for faster recall at scale",
        ));
    }

    Ok(HealthReport {
        score,
        weak_ratio,
        semantic_connectivity,
        embedding_coverage,
        code_coverage,
        diff_enrichment,
        vector_backend,
        embedder_backend: strata.embeddings.backend().as_str(),
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    #[test]
    fn decay_reduces_strength_proportional_to_elapsed_time_and_label_rate() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let id = strata.add_memory("Episode A", "body", &["Episode"], None, None, None, None).unwrap();

        let mut props = Properties::new();
        props.insert("last_accessed".to_string(), serde_json::json!((Utc::now() - chrono::Duration::days(100)).to_rfc3339()));
        strata.store().update_node_content(&id, None, &props).unwrap();

        let outcome = apply_decay(&strata).unwrap();
        assert_eq!(outcome.decayed, 1);
        let node = strata.store().get_node(&id).unwrap().unwrap();
        assert!(node.strength() < 1.0);
    }

    #[test]
    fn weak_label_applied_below_threshold() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let id = strata.add_memory("Episode B", "body", &["Episode"], None, None, None, None).unwrap();

        let mut props = Properties::new();
        props.insert("strength".to_string(), serde_json::json!(0.31));
        props.insert("last_accessed".to_string(), serde_json::json!((Utc::now() - chrono::Duration::days(400)).to_rfc3339()));
        strata.store().update_node_content(&id, None, &props).unwrap();

        let outcome = apply_decay(&strata).unwrap();
        assert_eq!(outcome.newly_weak, 1);
        let node = strata.store().get_node(&id).unwrap().unwrap();
        assert!(node.is_weak());
    }

    #[test]
    fn health_reports_full_score_for_empty_store() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let report = health(&strata).unwrap();
        assert!(report.score >= 0.0 && report.score <= 1.0);
    }
}
