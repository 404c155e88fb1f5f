//! Sleep engine (C8): ordered, idempotent, restartable consolidation phases
//! that run the full graph through dedup, cross-referencing, relatedness
//! discovery, theming, clustering, edge calibration, and hub/insight
//! promotion (§4.8). DECAY is delegated to [`crate::cognitive`], invoked as
//! the final phase here.
//!
//! Every phase commits its own progress and is safe to re-run: DEDUP and
//! CONNECT converge to a fixed point, RELATE/CALIBRATE only ever add or
//! nudge edges, and THEMES/CLUSTERS upsert their group nodes by title.
//! Cancellation is checked between phases (§5 "cancel-safe... at natural
//! phase... boundaries"); a cancelled run commits everything done so far and
//! reports `cancelled: true` rather than erroring.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::cognitive::{self, CognitiveError};
use crate::identity;
use crate::ingest::{self, IngestError};
use crate::memory::Strata;
use crate::model::{Edge, EdgeType, Node, NodeId, PrimaryLabel, Properties};
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SleepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Cognitive(#[from] CognitiveError),

    #[error("cognitive log write failed: {0}")]
    Log(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SleepError>;

/// Counts for one phase, the unit appended to `cognitive-log.jsonl` (§6.1).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseReport {
    pub phase: String,
    pub timestamp: String,
    pub nodes_merged: usize,
    pub edges_added: usize,
    /// Edges whose weight was reduced by CALIBRATE's stale-endpoint decay
    /// (§4.8 step 6, `calibrate_stale_after_days`).
    pub edges_decayed: usize,
    pub clusters_formed: usize,
    pub archived: usize,
    pub hubs: Vec<String>,
}

/// Outcome of a full [`run_sleep`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SleepReport {
    pub phases: Vec<PhaseReport>,
    pub cancelled: bool,
}

/// Runs all eight phases in order (§4.8). `cancel` is polled between phases;
/// when set, the run stops after committing the in-progress phase and
/// reports `cancelled: true`.
pub fn run_sleep(strata: &Strata, cancel: &AtomicBool) -> Result<SleepReport> {
    let mut report = SleepReport::default();
    let log_path = cognitive_log_path(strata);

    macro_rules! run_phase {
        ($name:expr, $body:expr) => {{
            let span = tracing::info_span!("sleep_phase", phase = $name);
            let _guard = span.enter();
            let mut phase = PhaseReport { phase: $name.to_string(), timestamp: Utc::now().to_rfc3339(), ..Default::default() };
            $body(&mut phase)?;
            tracing::info!(phase = $name, nodes_merged = phase.nodes_merged, edges_added = phase.edges_added, "sleep phase complete");
            append_log(&log_path, &phase)?;
            report.phases.push(phase);
            if cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                return Ok(report);
            }
        }};
    }

    run_phase!("DEDUP", |p: &mut PhaseReport| phase_dedup(strata, p));
    run_phase!("CONNECT", |p: &mut PhaseReport| phase_connect(strata, p));
    run_phase!("RELATE", |p: &mut PhaseReport| phase_relate(strata, p));
    run_phase!("THEMES", |p: &mut PhaseReport| phase_themes(strata, p));
    run_phase!("CLUSTERS", |p: &mut PhaseReport| phase_clusters(strata, p));
    run_phase!("CALIBRATE", |p: &mut PhaseReport| phase_calibrate(strata, p));
    run_phase!("PROMOTE", |p: &mut PhaseReport| phase_promote(strata, p));
    run_phase!("DECAY", |p: &mut PhaseReport| phase_decay(strata, p));

    Ok(report)
}

fn cognitive_log_path(strata: &Strata) -> Option<PathBuf> {
    let dir = strata.store().store_dir();
    if dir.as_os_str().is_empty() {
        None
    } else {
        Some(dir.join("cognitive-log.jsonl"))
    }
}

fn append_log(path: &Option<PathBuf>, phase: &PhaseReport) -> Result<()> {
    let Some(path) = path else { return Ok(()) };
    use std::io::Write;
    let line = serde_json::to_string(&json!({
        "timestamp": phase.timestamp,
        "phase": phase.phase,
        "counts": {
            "nodes_merged": phase.nodes_merged,
            "edges_added": phase.edges_added,
            "edges_decayed": phase.edges_decayed,
            "clusters_formed": phase.clusters_formed,
            "archived": phase.archived,
        },
        "hubs": phase.hubs,
    }))
    .expect("PhaseReport serializes");
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

fn normalized_title(title: &str) -> String {
    title.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// DEDUP (§4.8 step 1): merges nodes that share a primary label and
/// normalized title, or share a content hash outright, keeping the older id.
fn phase_dedup(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let nodes = strata.store().all_nodes()?;
    let mut removed: HashSet<NodeId> = HashSet::new();

    let mut by_title: HashMap<(PrimaryLabel, String), Vec<&Node>> = HashMap::new();
    let mut by_content: HashMap<String, Vec<&Node>> = HashMap::new();
    for node in &nodes {
        by_title.entry((node.primary_label(), normalized_title(&node.title))).or_default().push(node);
        by_content.entry(identity::content_hash(&node.content)).or_default().push(node);
    }

    let mut groups: Vec<Vec<&Node>> = Vec::new();
    groups.extend(by_title.into_values().filter(|g| g.len() > 1));
    groups.extend(by_content.into_values().filter(|g| g.len() > 1));

    for mut group in groups {
        group.sort_by_key(|n| n.created_at);
        let Some((survivor, duplicates)) = group.split_first() else { continue };
        if removed.contains(&survivor.id) {
            continue;
        }
        for duplicate in duplicates {
            if duplicate.id == survivor.id || removed.contains(&duplicate.id) {
                continue;
            }
            let mut patch = Properties::new();
            for (k, v) in &duplicate.properties {
                if !survivor.properties.contains_key(k) {
                    patch.insert(k.clone(), v.clone());
                }
            }
            if !patch.is_empty() {
                strata.store().update_node_content(&survivor.id, None, &patch)?;
            }
            phase.edges_added += strata.store().rewire_edges(&duplicate.id, &survivor.id)?;
            strata.store().delete_node(&duplicate.id)?;
            removed.insert(duplicate.id.clone());
            phase.nodes_merged += 1;
        }
    }
    Ok(())
}

/// CONNECT (§4.8 step 2): the cross-reference pass over the whole graph,
/// plus `SAME_SCOPE`, `MODIFIES_SAME`, and Commit→code `MODIFIES` edges.
fn phase_connect(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let xref = ingest::run_cross_reference_pass(strata, None)?;
    phase.edges_added += xref.edges_created;

    let commits = strata.store().find_by_label("Commit")?;

    let mut by_scope: HashMap<String, Vec<NodeId>> = HashMap::new();
    let mut by_file: HashMap<String, Vec<NodeId>> = HashMap::new();
    for commit in &commits {
        if let Some(scope) = commit.properties.get("scope").and_then(|v| v.as_str()) {
            by_scope.entry(scope.to_string()).or_default().push(commit.id.clone());
        }
        if let Some(files) = commit.properties.get("files").and_then(|v| v.as_array()) {
            for file in files.iter().filter_map(|f| f.as_str()) {
                by_file.entry(file.to_string()).or_default().push(commit.id.clone());
            }
        }
    }

    let cap = strata.config().connect_modifies_same_cap;
    for ids in by_scope.values() {
        phase.edges_added += add_pairwise(strata, ids, EdgeType::SameScope, cap)?;
    }
    for ids in by_file.values() {
        phase.edges_added += add_pairwise(strata, ids, EdgeType::ModifiesSame, cap)?;
    }

    let modules = strata.store().find_by_label("Module")?;
    let module_by_path: HashMap<&str, &NodeId> = modules
        .iter()
        .filter_map(|m| m.properties.get("file_path").and_then(|v| v.as_str()).map(|p| (p, &m.id)))
        .collect();
    for commit in &commits {
        let Some(files) = commit.properties.get("files").and_then(|v| v.as_array()) else { continue };
        for file in files.iter().filter_map(|f| f.as_str()) {
            if let Some(&module_id) = module_by_path.get(file) {
                strata.store().add_edge(&Edge::new(commit.id.clone(), module_id.clone(), EdgeType::ModifiesSame))?;
                phase.edges_added += 1;
            }
        }
    }

    // Lookup from both qualified and simple symbol names to node ids.
    let mut symbol_by_name: HashMap<String, NodeId> = HashMap::new();
    for label in ["Function", "Class", "Interface"] {
        for node in strata.store().find_by_label(label)? {
            if let Some(qualified) = node.properties.get("qualified_name").and_then(|v| v.as_str()) {
                symbol_by_name.insert(qualified.to_string(), node.id.clone());
                if let Some(simple) = qualified.rsplit("::").next() {
                    symbol_by_name.entry(simple.to_string()).or_insert_with(|| node.id.clone());
                }
            }
        }
    }

    for commit in &commits {
        let mut symbol_tokens: Vec<String> = Vec::new();
        for key in ["symbols_added", "symbols_modified"] {
            if let Some(arr) = commit.properties.get(key).and_then(|v| v.as_array()) {
                symbol_tokens.extend(arr.iter().filter_map(|v| v.as_str()).map(str::to_string));
            }
        }
        for token in symbol_tokens {
            let name = token.split(':').next_back().unwrap_or(&token);
            if let Some(target_id) = symbol_by_name.get(name) {
                strata.store().add_edge(&Edge::new(commit.id.clone(), target_id.clone(), EdgeType::Modifies))?;
                phase.edges_added += 1;
            }
        }
    }

    Ok(())
}

fn add_pairwise(strata: &Strata, ids: &[NodeId], edge_type: EdgeType, cap: usize) -> Result<usize> {
    let mut added = 0;
    'outer: for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if added >= cap {
                break 'outer;
            }
            strata.store().add_edge(&Edge::new(ids[i].clone(), ids[j].clone(), edge_type))?;
            added += 1;
        }
    }
    Ok(added)
}

/// RELATE (§4.8 step 3): pairwise cosine similarity over stratified samples,
/// adding `RELATED_TO` edges above the configured threshold. Re-embeds node
/// text on demand via the embedding service rather than reading vectors back
/// out of the ANN index, whose contract (§4.3) is query-only.
fn phase_relate(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let nodes = strata.store().all_nodes()?;
    let config = strata.config();

    let mut strata_groups: HashMap<PrimaryLabel, Vec<&Node>> = HashMap::new();
    for node in &nodes {
        strata_groups.entry(node.primary_label()).or_default().push(node);
    }

    let mut sample: Vec<&Node> = Vec::new();
    for (_, mut group) in strata_groups {
        group.sort_by_key(|n| deterministic_rank(&n.id, config.relate_sample_seed));
        group.truncate(config.relate_stratum_cap);
        sample.extend(group);
    }

    let mut embedded: Vec<(NodeId, Vec<f32>)> = Vec::new();
    for node in &sample {
        let text = crate::embeddings::EmbeddingService::node_text(&node.title, &node.content, config);
        match strata.embeddings.embed(&text) {
            Ok(vector) => embedded.push((node.id.clone(), vector)),
            Err(e) => tracing::warn!(node_id = %node.id, error = %e, "relate: skipping unembeddable node"),
        }
    }

    let mut comparisons = 0usize;
    'outer: for i in 0..embedded.len() {
        for j in (i + 1)..embedded.len() {
            if comparisons >= config.relate_comparison_cap {
                break 'outer;
            }
            comparisons += 1;
            let cos_sim = 1.0 - crate::vector::cosine_distance(&embedded[i].1, &embedded[j].1) as f64;
            if cos_sim >= config.relate_similarity_threshold {
                strata.store().add_edge(&Edge::new(embedded[i].0.clone(), embedded[j].0.clone(), EdgeType::RelatedTo))?;
                phase.edges_added += 1;
            }
        }
    }
    Ok(())
}

/// Deterministic FNV-1a mix of a node id with the configured seed, used to
/// pick a reproducible sample order without pulling in a `rand` dependency.
fn deterministic_rank(id: &str, seed: u64) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
    for byte in id.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// THEMES (§4.8 step 4): groups Commit nodes by `scope`; scopes with at
/// least `themes_min_commits` commits get a `Theme` node and
/// `BELONGS_TO_THEME` edges from every member commit.
fn phase_themes(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let commits = strata.store().find_by_label("Commit")?;
    let mut by_scope: HashMap<String, Vec<NodeId>> = HashMap::new();
    for commit in &commits {
        if let Some(scope) = commit.properties.get("scope").and_then(|v| v.as_str()) {
            by_scope.entry(scope.to_string()).or_default().push(commit.id.clone());
        }
    }

    for (scope, members) in by_scope {
        if members.len() < strata.config().themes_min_commits {
            continue;
        }
        let title = format!("theme:{scope}");
        let theme_id = identity::node_id(&title, &["Theme"]);
        strata.store().upsert_node(
            &theme_id,
            &title,
            &format!("Theme grouping {} commits scoped to `{scope}`.", members.len()),
            &["Theme".to_string()].into_iter().collect(),
            &Properties::new(),
            false,
        )?;
        for member in members {
            strata.store().add_edge(&Edge::new(member, theme_id.clone(), EdgeType::BelongsToTheme))?;
            phase.edges_added += 1;
        }
    }
    Ok(())
}

/// CLUSTERS (§4.8 step 5): groups Pattern nodes by their `cluster` property
/// into `PatternCluster` nodes with `CLUSTERED_IN` edges.
fn phase_clusters(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let patterns = strata.store().find_by_label("Pattern")?;
    let mut by_cluster: HashMap<String, Vec<NodeId>> = HashMap::new();
    for pattern in &patterns {
        if let Some(cluster) = pattern.properties.get("cluster").and_then(|v| v.as_str()) {
            by_cluster.entry(cluster.to_string()).or_default().push(pattern.id.clone());
        }
    }

    for (cluster, members) in by_cluster {
        let title = format!("cluster:{cluster}");
        let cluster_id = identity::node_id(&title, &["PatternCluster"]);
        strata.store().upsert_node(
            &cluster_id,
            &title,
            &format!("Pattern cluster `{cluster}` ({} members).", members.len()),
            &["PatternCluster".to_string()].into_iter().collect(),
            &Properties::new(),
            false,
        )?;
        for member in members {
            strata.store().add_edge(&Edge::new(member, cluster_id.clone(), EdgeType::ClusteredIn))?;
            phase.edges_added += 1;
        }
        phase.clusters_formed += 1;
    }
    Ok(())
}

/// CALIBRATE (§4.8 step 6): nudges edge weight up by co-access evidence on
/// its endpoints, then — when both endpoints have gone stale — applies the
/// optional weight decay §4.8 step 6 calls out ("edges whose endpoints
/// haven't been accessed in > 90 days"), via `calibrate_stale_after_days`.
/// The boost and the stale decay are independent adjustments; decay uses
/// [`crate::storage::Store::set_edge_weight`] directly since it must be able
/// to *lower* weight, which `add_edge`'s max-weight merge (§3 "edge
/// uniqueness") can never do.
fn phase_calibrate(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let all_types = [
        EdgeType::AuthoredBy, EdgeType::BelongsTo, EdgeType::References, EdgeType::InformedBy,
        EdgeType::Applies, EdgeType::RelatedTo, EdgeType::SameScope, EdgeType::ModifiesSame,
        EdgeType::BelongsToTheme, EdgeType::ClusteredIn, EdgeType::CoAccessed, EdgeType::Defines,
        EdgeType::Imports, EdgeType::Inherits, EdgeType::Implements, EdgeType::MemberOf,
        EdgeType::Modifies,
    ];
    let stale_after_days = strata.config().calibrate_stale_after_days;

    for edge_type in all_types {
        for edge in strata.store().edges_of_type(edge_type)? {
            let from_node = strata.store().get_node(&edge.from_id)?;
            let to_node = strata.store().get_node(&edge.to_id)?;

            let access_from = from_node
                .as_ref()
                .and_then(|n| n.properties.get("access_count").and_then(|v| v.as_i64()))
                .unwrap_or(0);
            let access_to = to_node
                .as_ref()
                .and_then(|n| n.properties.get("access_count").and_then(|v| v.as_i64()))
                .unwrap_or(0);

            let boosted = (edge.weight as f64 + 0.01 * ((1 + access_from + access_to) as f64).ln()).min(1.0) as f32;
            if boosted > edge.weight {
                strata.store().add_edge(&Edge::new(edge.from_id.clone(), edge.to_id.clone(), edge_type).with_weight(boosted))?;
                phase.edges_added += 1;
                continue;
            }

            let both_stale = from_node.as_ref().is_some_and(|n| node_is_stale(n, stale_after_days))
                && to_node.as_ref().is_some_and(|n| node_is_stale(n, stale_after_days));
            if both_stale {
                let decayed = (edge.weight * 0.99).max(0.01);
                if decayed < edge.weight {
                    strata.store().set_edge_weight(&edge.from_id, &edge.to_id, edge_type, decayed)?;
                    phase.edges_decayed += 1;
                }
            }
        }
    }
    Ok(())
}

/// Whether a node's last access (its `last_accessed` property, falling back
/// to `updated_at`) is older than `stale_after_days`.
fn node_is_stale(node: &Node, stale_after_days: i64) -> bool {
    let last_accessed = node
        .properties
        .get("last_accessed")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(node.updated_at);
    Utc::now() - last_accessed > chrono::Duration::days(stale_after_days)
}

/// PROMOTE/INSIGHTS (§4.8 step 7, optional): tags nodes with the widest
/// variety of distinct incoming/outgoing edge types as `Hub`, a cheap proxy
/// for betweenness. Insight synthesis is left to a caller building on top of
/// the hub list, since generating prose summaries is out of this crate's
/// scope (§0: no LLM calls).
fn phase_promote(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let nodes = strata.store().all_nodes()?;
    for node in &nodes {
        let neighbors = strata.graph().neighbors(&node.id, crate::model::Direction::Both, None)?;
        let distinct_types: HashSet<EdgeType> = neighbors.iter().map(|(_, t, _)| *t).collect();
        if distinct_types.len() >= 4 && !node.labels.contains("Hub") {
            let mut patch = Properties::new();
            patch.insert("promoted_hub_at".to_string(), json!(Utc::now().to_rfc3339()));
            strata.store().update_node_content(&node.id, None, &patch)?;
            strata.store().upsert_node(
                &node.id,
                &node.title,
                &node.content,
                &{
                    let mut labels = node.labels.clone();
                    labels.insert("Hub".to_string());
                    labels
                },
                &node.properties,
                true,
            )?;
            phase.hubs.push(node.id.clone());
        }
    }
    Ok(())
}

fn phase_decay(strata: &Strata, phase: &mut PhaseReport) -> Result<()> {
    let outcome = cognitive::apply_decay(strata)?;
    phase.archived = outcome.archived;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    #[test]
    fn dedup_merges_identical_title_and_labels_keeping_older() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let title = "Some Node";
        let id_a = strata.add_memory(title, "body a", &["Concept"], None, None, None, None).unwrap();
        // A second node with a different id but equal normalized title and label.
        let id_b = identity::node_id("Different title entirely", &["Concept"]);
        strata
            .store()
            .upsert_node(&id_b, title, "body a", &["Concept".to_string()].into_iter().collect(), &Properties::new(), false)
            .unwrap();

        let cancel = AtomicBool::new(false);
        let report = run_sleep(&strata, &cancel).unwrap();
        let dedup = report.phases.iter().find(|p| p.phase == "DEDUP").unwrap();
        assert_eq!(dedup.nodes_merged, 1);
        assert!(strata.store().get_node(&id_a).unwrap().is_some());
        let _ = id_b;
    }

    #[test]
    fn connect_creates_same_scope_and_modifies_same_edges() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        for (subject, scope) in [("feat(cache): a", "cache"), ("feat(cache): b", "cache")] {
            let mut props = Properties::new();
            props.insert("scope".to_string(), json!(scope));
            props.insert("files".to_string(), json!(["src/cache.rs"]));
            props.insert("commit_hash".to_string(), json!(subject));
            strata.add_memory(subject, subject, &["Episode", "Commit"], Some(props), None, None, None).unwrap();
        }

        let cancel = AtomicBool::new(false);
        let report = run_sleep(&strata, &cancel).unwrap();
        let connect = report.phases.iter().find(|p| p.phase == "CONNECT").unwrap();
        assert!(connect.edges_added >= 2);
    }

    #[test]
    fn themes_requires_minimum_commit_count() {
        let mut config = StrataConfig::default();
        config.themes_min_commits = 2;
        let strata = Strata::open_in_memory(config).unwrap();
        for subject in ["feat(auth): a", "feat(auth): b"] {
            let mut props = Properties::new();
            props.insert("scope".to_string(), json!("auth"));
            strata.add_memory(subject, subject, &["Episode", "Commit"], Some(props), None, None, None).unwrap();
        }
        let cancel = AtomicBool::new(false);
        run_sleep(&strata, &cancel).unwrap();
        let themes = strata.store().find_by_label("Theme").unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].title, "theme:auth");
    }

    #[test]
    fn calibrate_decays_edges_with_both_endpoints_stale() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let a = strata.add_memory("A", "a", &["Concept"], None, None, None, None).unwrap();
        let b = strata.add_memory("B", "b", &["Concept"], None, None, None, None).unwrap();

        let stale_date = (Utc::now() - chrono::Duration::days(200)).to_rfc3339();
        for id in [&a, &b] {
            let mut patch = Properties::new();
            patch.insert("last_accessed".to_string(), json!(stale_date));
            strata.store().update_node_content(id, None, &patch).unwrap();
        }
        strata
            .store()
            .add_edge(&Edge::new(a.clone(), b.clone(), EdgeType::RelatedTo).with_weight(0.9))
            .unwrap();

        let mut phase = PhaseReport::default();
        phase_calibrate(&strata, &mut phase).unwrap();

        assert_eq!(phase.edges_decayed, 1);
        let edge = strata.store().get_edge(&a, &b, EdgeType::RelatedTo).unwrap().unwrap();
        assert!(edge.weight < 0.9, "expected weight to decay below 0.9, got {}", edge.weight);
    }

    #[test]
    fn calibrate_leaves_fresh_edges_alone() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let a = strata.add_memory("A", "a", &["Concept"], None, None, None, None).unwrap();
        let b = strata.add_memory("B", "b", &["Concept"], None, None, None, None).unwrap();
        strata
            .store()
            .add_edge(&Edge::new(a.clone(), b.clone(), EdgeType::RelatedTo).with_weight(0.9))
            .unwrap();

        let mut phase = PhaseReport::default();
        phase_calibrate(&strata, &mut phase).unwrap();

        assert_eq!(phase.edges_decayed, 0);
        let edge = strata.store().get_edge(&a, &b, EdgeType::RelatedTo).unwrap().unwrap();
        assert_eq!(edge.weight, 0.9);
    }

    #[test]
    fn cancellation_stops_after_current_phase() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let cancel = AtomicBool::new(true);
        let report = run_sleep(&strata, &cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.phases.len(), 1);
        assert_eq!(report.phases[0].phase, "DEDUP");
    }
}
