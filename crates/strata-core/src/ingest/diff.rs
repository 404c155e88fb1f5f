//! Diff enrichment adapter (§4.6, §8 scenario 3).
//!
//! The diff parser itself is out of scope (SPEC_FULL.md §0); this adapter
//! consumes its structured output — [`DiffEnrichment`] — and appends it onto
//! an existing Commit node located by `commit_hash`. Commits without a
//! pre-existing node are silently skipped (§4.6); re-runs with
//! `unenriched_only` skip commits that already carry `diff_enriched_at`.

use chrono::Utc;
use serde_json::{json, Value};

use crate::memory::Strata;
use crate::model::Properties;

use super::{IngestReport, Result};

/// Structured output of the external diff parser for one commit (§4.6).
#[derive(Debug, Clone, Default)]
pub struct DiffEnrichment {
    pub commit_hash: String,
    pub symbols_added: Vec<String>,
    pub symbols_modified: Vec<String>,
    pub symbols_deleted: Vec<String>,
    /// One of the closed set in §6.2: `tiny_fix, small_fix, feature_add,
    /// feature_modify, refactor, large_refactor, config_change,
    /// documentation, test`.
    pub change_shape: String,
    pub diff_summary: String,
}

/// Applies a batch of diff enrichments to already-ingested Commit nodes.
/// `unenriched_only` restricts the batch to commits without a prior
/// `diff_enriched_at` (§4.6: "re-runs may skip commits... when the
/// `unenriched_only` flag is true").
pub fn enrich_commit_diff(
    strata: &Strata,
    enrichments: &[DiffEnrichment],
    unenriched_only: bool,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for enrichment in enrichments {
        let hits = strata
            .store()
            .find_by_property("commit_hash", &Value::String(enrichment.commit_hash.clone()))?;
        let Some(node) = hits.into_iter().next() else {
            report.warn(format!(
                "commit {} has no existing node, skipping diff enrichment",
                enrichment.commit_hash
            ));
            continue;
        };

        if unenriched_only && node.properties.contains_key("diff_enriched_at") {
            continue;
        }

        let content = format!("{}\n\n{}", node.content, enrichment.diff_summary);
        let mut patch = Properties::new();
        patch.insert("symbols_added".to_string(), json!(enrichment.symbols_added));
        patch.insert("symbols_modified".to_string(), json!(enrichment.symbols_modified));
        patch.insert("symbols_deleted".to_string(), json!(enrichment.symbols_deleted));
        patch.insert("change_shape".to_string(), json!(enrichment.change_shape));
        patch.insert("diff_enriched_at".to_string(), json!(Utc::now().to_rfc3339()));

        strata.store().update_node_content(&node.id, Some(&content), &patch)?;

        let text = crate::embeddings::EmbeddingService::node_text(&node.title, &content, strata.config());
        match strata.embeddings.embed(&text) {
            Ok(vector) => {
                let mut index = strata.vector_index.lock().expect("vector index mutex poisoned");
                if let Err(e) = index.upsert(&node.id, &vector) {
                    tracing::warn!(node_id = %node.id, error = %e, "failed to refresh embedding after diff enrichment");
                }
            }
            Err(e) => {
                tracing::warn!(node_id = %node.id, error = %e, "failed to regenerate embedding after diff enrichment");
            }
        }

        report.nodes_ingested += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    #[test]
    fn enriches_existing_commit_and_sets_diff_enriched_at() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let mut props = Properties::new();
        props.insert("commit_hash".to_string(), json!("abc123"));
        strata
            .add_memory(
                "feat(cache): add LRU eviction",
                "feat(cache): add LRU eviction",
                &["Episode", "Commit"],
                Some(props),
                None,
                None,
                None,
            )
            .unwrap();

        let enrichment = DiffEnrichment {
            commit_hash: "abc123".to_string(),
            symbols_added: vec!["function:evict".to_string()],
            symbols_modified: vec![],
            symbols_deleted: vec![],
            change_shape: "feature_add".to_string(),
            diff_summary: "added evict() to the LRU cache".to_string(),
        };
        let report = enrich_commit_diff(&strata, &[enrichment], false).unwrap();
        assert_eq!(report.nodes_ingested, 1);

        let hits = strata.store().find_by_property("commit_hash", &Value::String("abc123".into())).unwrap();
        let node = &hits[0];
        assert!(node.content.contains("feature_add") || node.properties["change_shape"] == "feature_add");
        assert!(node.content.contains("function:evict") || node.properties["symbols_added"][0] == "function:evict");
        assert!(node.properties.contains_key("diff_enriched_at"));
    }

    #[test]
    fn unenriched_only_skips_already_enriched_commits() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let mut props = Properties::new();
        props.insert("commit_hash".to_string(), json!("abc123"));
        strata
            .add_memory("subject", "body", &["Episode", "Commit"], Some(props), None, None, None)
            .unwrap();

        let enrichment = DiffEnrichment {
            commit_hash: "abc123".to_string(),
            change_shape: "refactor".to_string(),
            diff_summary: "first pass".to_string(),
            ..Default::default()
        };
        enrich_commit_diff(&strata, &[enrichment.clone()], true).unwrap();
        let second = DiffEnrichment { diff_summary: "second pass".to_string(), ..enrichment };
        let report = enrich_commit_diff(&strata, &[second], true).unwrap();
        assert_eq!(report.nodes_ingested, 0);
    }

    #[test]
    fn missing_commit_is_skipped_not_errored() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let enrichment = DiffEnrichment {
            commit_hash: "doesnotexist".to_string(),
            change_shape: "refactor".to_string(),
            ..Default::default()
        };
        let report = enrich_commit_diff(&strata, &[enrichment], false).unwrap();
        assert_eq!(report.nodes_ingested, 0);
        assert_eq!(report.nodes_skipped, 1);
    }
}
