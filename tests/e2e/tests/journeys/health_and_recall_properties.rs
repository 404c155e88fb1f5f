//! §8 scenario 6 (health/backend report) plus the reinforcement and
//! compact/expanded parity invariants.

use strata_core::cognitive;
use strata_core::recall::{self, RecallFilters, RecallOptions};
use strata_e2e_tests::harness::TestDatabaseManager;

#[test]
fn health_reports_the_active_vector_backend_and_recommendations_for_an_empty_store() {
    let db = TestDatabaseManager::new_temp();
    let report = cognitive::health(&db.strata).unwrap();

    assert!(report.vector_backend == "ann" || report.vector_backend == "flat");
    assert!(report.score >= 0.0 && report.score <= 1.0);
    // An empty store has no code and no semantic edges, so at least one
    // recommendation is expected regardless of which backend answered.
    assert!(!report.recommendations.is_empty());
}

#[test]
fn recall_reinforces_strength_and_access_count_of_returned_results() {
    let db = TestDatabaseManager::new_temp();
    let id = db.strata.add_memory("Episode about caching", "details about cache eviction", &["Episode"], None, None, None, None).unwrap();

    let before = db.strata.store().get_node(&id).unwrap().unwrap();
    let before_strength = before.strength();
    let before_access = before.properties.get("access_count").and_then(|v| v.as_i64()).unwrap_or(0);

    let filters = RecallFilters::default();
    let options = RecallOptions { top: 5, ..Default::default() };
    let response = recall::recall(&db.strata, Some("caching"), &filters, &options).unwrap();
    assert!(response.results.iter().any(|r| r.id == id));

    let after = db.strata.store().get_node(&id).unwrap().unwrap();
    assert!(after.strength() >= before_strength);
    assert!(after.strength() <= 1.0);
    let after_access = after.properties.get("access_count").and_then(|v| v.as_i64()).unwrap_or(0);
    assert_eq!(after_access, before_access + 1);
}

#[test]
fn compact_mode_drops_content_but_keeps_id_title_score_and_connections() {
    let db = TestDatabaseManager::new_temp();
    db.strata.add_memory("Episode one", "full body text", &["Episode"], None, None, None, None).unwrap();

    let filters = RecallFilters::default();
    let full = recall::recall(&db.strata, Some("Episode"), &filters, &RecallOptions::default()).unwrap();
    let compact = recall::recall(
        &db.strata,
        Some("Episode"),
        &filters,
        &RecallOptions { compact: true, ..Default::default() },
    )
    .unwrap();

    assert_eq!(full.results.len(), compact.results.len());
    for (f, c) in full.results.iter().zip(compact.results.iter()) {
        assert_eq!(f.id, c.id);
        assert_eq!(f.title, c.title);
        assert_eq!(f.score, c.score);
        assert_eq!(f.connections.len(), c.connections.len());
        assert!(c.content.is_none());
    }
}
