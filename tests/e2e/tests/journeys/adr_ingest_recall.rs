//! §8 scenario 1: ADR ingest + recall.

use strata_core::recall::{self, RecallFilters, RecallOptions};
use strata_e2e_tests::harness::TestDatabaseManager;

const ADR_LOG: &str = "\
# Architecture Decisions

## ADR-007: Use an embedded store

Context: we need a local-first store with no external service dependency.
Decision: chosen backend is SQLite with FTS5.
";

#[test]
fn ingesting_an_adr_makes_it_recallable_by_type() {
    let mut db = TestDatabaseManager::new_temp();
    let report = strata_core::ingest::ingest_adrs(&db.strata, ADR_LOG).unwrap();
    assert_eq!(report.nodes_ingested, 1);

    let filters = RecallFilters { type_filter: Some("adr".to_string()), ..Default::default() };
    let options = RecallOptions { top: 1, ..Default::default() };
    let response = recall::recall(&db.strata, Some("embedded store"), &filters, &options).unwrap();

    assert_eq!(response.results.len(), 1);
    let hit = &response.results[0];
    assert!(hit.labels.contains(&"ADR".to_string()));
    assert!(hit.labels.contains(&"Decision".to_string()));
    assert!(hit.title.starts_with("ADR-007:"));
    assert!(hit.score > 0.3, "expected score > 0.3, got {}", hit.score);

    // Re-ingesting the same log must not duplicate the node (§3 Identity,
    // §8 "Upsert idempotence").
    strata_core::ingest::ingest_adrs(&db.strata, ADR_LOG).unwrap();
    assert_eq!(db.node_count(), 1);
}
