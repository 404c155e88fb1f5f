//! §8 scenario 3: commit ingest + diff enrichment.

use serde_json::Value;

use strata_core::ingest::{enrich_commit_diff, DiffEnrichment};
use strata_core::model::Properties;
use strata_e2e_tests::harness::TestDatabaseManager;

#[test]
fn diff_enrichment_records_shape_and_symbols_and_is_idempotent() {
    let mut db = TestDatabaseManager::new_temp();

    let mut props = Properties::new();
    props.insert("commit_hash".to_string(), serde_json::json!("abc123"));
    db.strata
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
    let report = enrich_commit_diff(&db.strata, &[enrichment.clone()], true).unwrap();
    assert_eq!(report.nodes_ingested, 1);

    let hits = db
        .strata
        .store()
        .find_by_property("commit_hash", &Value::String("abc123".to_string()))
        .unwrap();
    let node = &hits[0];
    assert!(node.content.contains("feature_add") || node.properties["change_shape"] == "feature_add");
    assert!(node.content.contains("function:evict") || node.properties["symbols_added"][0] == "function:evict");
    assert!(node.properties.contains_key("diff_enriched_at"));

    // Re-running with unenriched_only must skip the already-enriched commit.
    let second = enrich_commit_diff(&db.strata, &[enrichment], true).unwrap();
    assert_eq!(second.nodes_ingested, 0);
}
