//! §8 scenario 2: cross-reference round-trip via sleep's CONNECT phase.

use std::sync::atomic::AtomicBool;

use strata_core::recall::{self, RecallFilters, RecallOptions};
use strata_core::sleep;
use strata_e2e_tests::harness::TestDatabaseManager;

#[test]
fn wikilink_becomes_a_references_edge_after_sleep() {
    let mut db = TestDatabaseManager::new_temp();

    strata_core::ingest::ingest_adrs(
        &db.strata,
        "## ADR-007: Use an embedded store\n\nContext... Decision: chosen backend.\n",
    )
    .unwrap();

    strata_core::ingest::ingest_patterns(
        &db.strata,
        "### PAT-001: Single writer lock\n\nSee [[ADR-007: Use an embedded store]] for context.\n",
    )
    .unwrap();

    let cancel = AtomicBool::new(false);
    let sleep_report = sleep::run_sleep(&db.strata, &cancel).unwrap();
    assert!(sleep_report.phases.iter().any(|p| p.phase == "CONNECT"));

    let adr_id = db
        .strata
        .store()
        .find_by_title("ADR-007: Use an embedded store")
        .unwrap()
        .expect("adr node exists")
        .id;

    let filters = RecallFilters { type_filter: Some("pattern".to_string()), ..Default::default() };
    let options = RecallOptions { top: 1, ..Default::default() };
    let response = recall::recall(&db.strata, Some("pattern"), &filters, &options).unwrap();

    assert_eq!(response.results.len(), 1);
    let pattern = &response.results[0];
    assert!(
        pattern
            .connections
            .iter()
            .any(|c| c.edge_type == strata_core::EdgeType::References && c.id == adr_id),
        "expected a REFERENCES connection to the ADR, got {:?}",
        pattern.connections
    );

    // §8 scenario 2's literal `{type:"REFERENCES", id:<adr-id>}` is a claim
    // about the emitted JSON, not just the in-memory `EdgeType`; check the
    // wire shape too (§6.3 schema: `connections[].type`).
    let json = serde_json::to_string(&response).unwrap();
    assert!(
        json.contains("\"type\":\"REFERENCES\""),
        "expected a `\"type\":\"REFERENCES\"` connection in the JSON payload, got {json}"
    );
    assert!(json.contains(&adr_id), "expected the ADR id in the JSON payload, got {json}");
}
