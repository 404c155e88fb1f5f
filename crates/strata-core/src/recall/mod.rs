//! Recall engine (C7): hybrid retrieval combining dense-vector similarity,
//! lexical full-text scoring, temporal filtering, bounded spreading
//! activation, and access-driven reinforcement (§4.7).
//!
//! A note on two spec passages that read as contradictory: §4.7 step 8 says
//! compact mode drops both `content` and `connections`, while §8's testable
//! property "Compact vs expanded parity" requires the connection set to be
//! identical between compact and full mode. This implementation follows the
//! testable property — compact mode omits only `content` (unless the id is
//! in `expand`) — since connections are what let a caller "pivot without
//! another call" (§4.7 step 7), which compact mode should not forfeit. See
//! DESIGN.md.

mod types;

pub use types::{
    BackendInfo, Connection, RecallFilters, RecallOptions, RecallResponse, RecallResult, SortMode,
};

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::{json, Value};

use crate::memory::Strata;
use crate::model::{Direction, Edge, EdgeType, Node, NodeId};
use crate::storage::StoreError;
use crate::vector::BackendKind;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RecallError {
    /// §7 class 1: store read failure is caller-visible, never silent.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RecallError>;

/// Maps a recall `--type` filter token to the label set it resolves to
/// (§4.7 "canonical set mapping to label sets").
pub fn type_filter_labels(type_tag: &str) -> Option<&'static [&'static str]> {
    Some(match type_tag {
        "adr" => &["ADR", "Decision"],
        "decision" => &["Decision"],
        "pattern" => &["Pattern"],
        "anti-pattern" => &["AntiPattern"],
        "concept" => &["Concept"],
        "glossary" => &["Glossary"],
        "rule" => &["BusinessRule"],
        "experience" => &["Experience"],
        "commit" => &["Commit"],
        "episode" => &["Episode"],
        "person" => &["Person"],
        "theme" => &["Theme"],
        "cluster" => &["PatternCluster"],
        "module" => &["Module"],
        "class" => &["Class"],
        "function" => &["Function"],
        "interface" => &["Interface"],
        "code" => &["Code"],
        _ => return None,
    })
}

/// `recall(query, filters, options) -> ranked results` (§4.7).
pub fn recall(
    strata: &Strata,
    query: Option<&str>,
    filters: &RecallFilters,
    options: &RecallOptions,
) -> Result<RecallResponse> {
    let candidates = filter_phase(strata, filters)?;

    let scored: Vec<(NodeId, f64)> = match query {
        None | Some("") => {
            let mut ranked: Vec<(NodeId, chrono::DateTime<Utc>, f64)> = candidates
                .iter()
                .map(|n| (n.id.clone(), node_date(n), n.strength()))
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.total_cmp(&a.2)));
            ranked.into_iter().map(|(id, _, strength)| (id, strength)).collect()
        }
        Some(query) => score_with_query(strata, query, &candidates, filters, options)?,
    };

    let total = scored.len();
    let mut top_ids: Vec<(NodeId, f64)> = scored.into_iter().take(options.top).collect();

    if !matches!(options.sort, SortMode::Relevance) {
        let by_id: HashMap<&str, &Node> = candidates.iter().map(|n| (n.id.as_str(), n)).collect();
        top_ids.sort_by(|a, b| {
            let da = by_id.get(a.0.as_str()).map(|n| node_date(n));
            let db = by_id.get(b.0.as_str()).map(|n| node_date(n));
            db.cmp(&da)
        });
    }

    reinforce_and_link(strata, &top_ids)?;

    let by_id: HashMap<NodeId, &Node> = candidates.iter().map(|n| (n.id.clone(), n)).collect();
    let mut results = Vec::with_capacity(top_ids.len());
    for (id, score) in &top_ids {
        let Some(node) = by_id.get(id).copied() else { continue };
        results.push(build_result(strata, node, *score, query, options)?);
    }

    Ok(RecallResponse {
        query: query.filter(|q| !q.is_empty()).map(str::to_string),
        total,
        backend: backend_info(strata),
        results,
    })
}

fn node_date(node: &Node) -> chrono::DateTime<Utc> {
    node.properties
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(node.updated_at)
}

/// Step 1: resolve the candidate set via label and temporal filters at the
/// store level. Archived nodes are excluded by default (§4.9 "excluded from
/// default recall candidates").
fn filter_phase(strata: &Strata, filters: &RecallFilters) -> Result<Vec<Node>> {
    let mut candidates: Vec<Node> = match &filters.type_filter {
        Some(tag) => {
            let labels = type_filter_labels(tag).unwrap_or(&[]);
            let mut seen: HashSet<NodeId> = HashSet::new();
            let mut out = Vec::new();
            for label in labels {
                for node in strata.store().find_by_label(label)? {
                    if seen.insert(node.id.clone()) {
                        out.push(node);
                    }
                }
            }
            out
        }
        None => strata.store().all_nodes()?,
    };

    candidates.retain(|n| !n.is_archived());

    if let Some(days) = filters.recent_days {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        candidates.retain(|n| node_date(n) >= cutoff || n.updated_at >= cutoff);
    }
    if let Some(since) = filters.since {
        candidates.retain(|n| node_date(n) >= since);
    }
    if let Some(author) = &filters.author {
        candidates.retain(|n| {
            n.properties.get("author_email").and_then(Value::as_str) == Some(author.as_str())
                || n.properties.get("author").and_then(Value::as_str) == Some(author.as_str())
        });
    }

    Ok(candidates)
}

/// Steps 2–5: semantic + lexical scoring, spreading activation, type
/// priority boost, and final ranking.
fn score_with_query(
    strata: &Strata,
    query: &str,
    candidates: &[Node],
    filters: &RecallFilters,
    options: &RecallOptions,
) -> Result<Vec<(NodeId, f64)>> {
    let candidate_ids: HashSet<&str> = candidates.iter().map(|n| n.id.as_str()).collect();

    let sim: HashMap<NodeId, f64> = match strata.embeddings.embed_query_cached(query) {
        Ok(vector) => {
            let index = strata.vector_index.lock().expect("vector index mutex poisoned");
            match index.query(&vector, candidates.len().max(1)) {
                Ok(hits) => hits
                    .into_iter()
                    .filter(|(id, _)| candidate_ids.contains(id.as_str()))
                    .map(|(id, distance)| (id, ((2.0 - distance as f64) / 2.0).clamp(0.0, 1.0)))
                    .collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "vector index query failed, continuing lexical-only");
                    HashMap::new()
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "embedder unavailable, falling back to lexical-only scoring");
            HashMap::new()
        }
    };

    let lex: HashMap<NodeId, f64> = {
        let hits = strata.store().fts_search(query, candidates.len().max(1))?;
        let hits = if hits.is_empty() {
            strata.store().keyword_search(query, candidates.len().max(1))?
        } else {
            hits
        };
        hits.into_iter()
            .filter(|(id, _)| candidate_ids.contains(id.as_str()))
            .collect()
    };

    let mut s0: HashMap<NodeId, f64> = HashMap::new();
    for node in candidates {
        let score = 2.0 * sim.get(&node.id).copied().unwrap_or(0.0) + lex.get(&node.id).copied().unwrap_or(0.0);
        s0.insert(node.id.clone(), score);
    }

    let mut seeds: Vec<(NodeId, f64)> = sim.iter().map(|(id, s)| (id.clone(), *s)).collect();
    seeds.sort_by(|a, b| b.1.total_cmp(&a.1));
    seeds.truncate(strata.config().recall_spread_seeds);

    let activation = if seeds.is_empty() {
        HashMap::new()
    } else {
        strata
            .graph()
            .spread(&seeds, options.depth.max(1), strata.config().spread_decay, strata.config().spread_max_nodes)?
    };

    let type_boost = strata.config().type_boost;
    let boost_labels: HashSet<&str> = filters
        .type_filter
        .as_deref()
        .and_then(type_filter_labels)
        .map(|l| l.iter().copied().collect())
        .unwrap_or_default();

    let mut s1: Vec<(NodeId, f64)> = candidates
        .iter()
        .map(|node| {
            let base = s0.get(&node.id).copied().unwrap_or(0.0) + activation.get(&node.id).copied().unwrap_or(0.0);
            let boosted = if !boost_labels.is_empty() && node.labels.iter().any(|l| boost_labels.contains(l.as_str())) {
                base * type_boost
            } else {
                base
            };
            (node.id.clone(), boosted)
        })
        .collect();

    s1.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(s1)
}

/// Step 6: reinforcement plus `CO_ACCESSED` pairing among the top results.
fn reinforce_and_link(strata: &Strata, top_ids: &[(NodeId, f64)]) -> Result<()> {
    let factor = strata.config().reinforcement_factor;
    for (id, _) in top_ids {
        if let Some(node) = strata.store().get_node(id)? {
            let new_strength = (node.strength() * factor).min(1.0);
            let access_count = node.properties.get("access_count").and_then(Value::as_i64).unwrap_or(0) + 1;
            let mut patch = crate::model::Properties::new();
            patch.insert("strength".to_string(), json!(new_strength));
            patch.insert("access_count".to_string(), json!(access_count));
            patch.insert("last_accessed".to_string(), json!(Utc::now().to_rfc3339()));
            strata.store().update_node_content(id, None, &patch)?;
        }
    }

    let cap = strata.config().co_accessed_pairing_cap.min(top_ids.len());
    let initial = strata.config().co_accessed_initial_weight;
    let increment = strata.config().co_accessed_increment;
    let max_weight = strata.config().co_accessed_max_weight;

    for i in 0..cap {
        for j in (i + 1)..cap {
            let (a, _) = &top_ids[i];
            let (b, _) = &top_ids[j];
            let existing = strata.store().get_edge(a, b, EdgeType::CoAccessed)?;
            let weight = match existing {
                Some(edge) => (edge.weight + increment).min(max_weight),
                None => initial,
            };
            strata.store().add_edge(&Edge::new(a.clone(), b.clone(), EdgeType::CoAccessed).with_weight(weight))?;
        }
    }
    Ok(())
}

/// Step 7 + 8: attach summarized connections and shape the payload by
/// `compact`/`expand` (see module docs for the compact/connections decision).
fn build_result(
    strata: &Strata,
    node: &Node,
    score: f64,
    query: Option<&str>,
    options: &RecallOptions,
) -> Result<RecallResult> {
    let mut neighbors = strata.graph().neighbors(&node.id, Direction::Both, None)?;
    neighbors.sort_by(|a, b| a.1.connection_priority().cmp(&b.1.connection_priority()).then(b.2.total_cmp(&a.2)));
    neighbors.truncate(strata.config().connections_per_result);

    let mut connections = Vec::with_capacity(neighbors.len());
    for (neighbor_id, edge_type, weight) in neighbors {
        if let Some(neighbor) = strata.store().get_node(&neighbor_id)? {
            connections.push(Connection { id: neighbor_id, title: neighbor.title, edge_type, weight });
        }
    }

    let summary: String = node.content.chars().take(strata.config().summary_chars).collect();
    let include_content = !options.compact || options.expand.iter().any(|id| id == &node.id);

    let _ = query;
    Ok(RecallResult {
        id: node.id.clone(),
        title: node.title.clone(),
        labels: node.labels.iter().cloned().collect(),
        score,
        date: node.properties.get("date").and_then(Value::as_str).map(str::to_string),
        content: include_content.then(|| node.content.clone()),
        summary,
        connections,
    })
}

fn backend_info(strata: &Strata) -> BackendInfo {
    let vector_stats = strata.vector_index.lock().expect("vector index mutex poisoned").stats();
    BackendInfo {
        vector: match vector_stats.backend {
            BackendKind::Ann => "ann",
            BackendKind::Flat => "flat",
        },
        embedder: strata.embeddings.backend().as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    #[test]
    fn adr_ingest_then_recall_returns_it_with_high_score() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        crate::ingest::ingest_adrs(
            &strata,
            "## ADR-007: Use an embedded store\n\nContext...\nDecision: chosen backend.\n",
        )
        .unwrap();

        let filters = RecallFilters { type_filter: Some("adr".to_string()), ..Default::default() };
        let options = RecallOptions { top: 1, ..Default::default() };
        let response = recall(&strata, Some("embedded store"), &filters, &options).unwrap();

        assert_eq!(response.results.len(), 1);
        let result = &response.results[0];
        assert!(result.labels.contains(&"ADR".to_string()));
        assert!(result.labels.contains(&"Decision".to_string()));
        assert!(result.title.starts_with("ADR-007:"));
    }

    #[test]
    fn recall_reinforces_strength_and_access_count() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let id = strata
            .add_memory("Some concept", "explaining the concept in detail", &["Concept"], None, None, None, None)
            .unwrap();
        let before = strata.store().get_node(&id).unwrap().unwrap();

        recall(&strata, Some("concept"), &RecallFilters::default(), &RecallOptions::default()).unwrap();

        let after = strata.store().get_node(&id).unwrap().unwrap();
        assert!(after.strength() >= before.strength());
        let access_count = after.properties.get("access_count").and_then(Value::as_i64).unwrap_or(0);
        assert_eq!(access_count, 1);
    }

    #[test]
    fn empty_query_sorts_by_date_then_strength() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        strata.add_memory("Old", "old body", &["Concept"], None, None, None, None).unwrap();
        strata.add_memory("New", "new body", &["Concept"], None, None, None, None).unwrap();
        let options = RecallOptions { top: 10, ..Default::default() };
        let response = recall(&strata, None, &RecallFilters::default(), &options).unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn compact_mode_preserves_connections_and_only_drops_content() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        strata.add_memory("ADR-007: Use an embedded store", "body", &["Decision", "ADR"], None, None, None, None).unwrap();
        let pattern_id = strata
            .add_memory(
                "Pattern referencing ADR",
                "See [[ADR-007: Use an embedded store]] for context.",
                &["Pattern", "ApprovedPattern"],
                None,
                None,
                None,
                None,
            )
            .unwrap();
        crate::ingest::run_cross_reference_pass(&strata, None).unwrap();

        let full = recall(&strata, Some("pattern"), &RecallFilters::default(), &RecallOptions::default()).unwrap();
        let compact_opts = RecallOptions { compact: true, ..Default::default() };
        let compact = recall(&strata, Some("pattern"), &RecallFilters::default(), &compact_opts).unwrap();

        let full_result = full.results.iter().find(|r| r.id == pattern_id).unwrap();
        let compact_result = compact.results.iter().find(|r| r.id == pattern_id).unwrap();

        assert_eq!(full_result.id, compact_result.id);
        assert_eq!(full_result.title, compact_result.title);
        assert_eq!(full_result.connections.len(), compact_result.connections.len());
        assert!(compact_result.content.is_none());
        assert!(full_result.content.is_some());
    }
}
