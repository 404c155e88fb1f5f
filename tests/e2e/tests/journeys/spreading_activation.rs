//! §8 scenario 4: spreading activation over a small hand-built graph.

use strata_core::model::{Edge, EdgeType, Properties};
use strata_e2e_tests::harness::TestDatabaseManager;

#[test]
fn activation_decays_per_hop_along_weighted_edges() {
    let db = TestDatabaseManager::new_temp();
    let store = db.strata.store();

    for id in ["a", "b", "c"] {
        store
            .upsert_node(id, id, id, &["Concept".to_string()].into_iter().collect(), &Properties::new(), false)
            .unwrap();
    }
    store.add_edge(&Edge::new("a", "b", EdgeType::References).with_weight(0.8)).unwrap();
    store.add_edge(&Edge::new("b", "c", EdgeType::RelatedTo).with_weight(0.7)).unwrap();

    let activation = db.strata.graph().spread(&[("a".to_string(), 1.0)], 2, 0.5, 200).unwrap();

    assert!((activation["b"] - 0.40).abs() < 1e-9);
    assert!((activation["c"] - 0.14).abs() < 1e-9);
}
