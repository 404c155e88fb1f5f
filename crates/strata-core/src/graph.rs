//! Thin graph-vocabulary façade over the store (C5), plus bounded spreading
//! activation.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::model::{Direction, Edge, EdgeType, Node, NodeId};
use crate::storage::{Result, Store};

/// Exposes the store in graph vocabulary so higher components don't embed
/// SQL (§4.5).
pub struct GraphApi<'a> {
    store: &'a Store,
}

impl<'a> GraphApi<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn node(&self, id: &str) -> Result<Option<Node>> {
        self.store.get_node(id)
    }

    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        types: Option<&[EdgeType]>,
    ) -> Result<Vec<(NodeId, EdgeType, f32)>> {
        self.store.neighbors(id, direction, types)
    }

    pub fn edges_of_type(&self, edge_type: EdgeType) -> Result<Vec<Edge>> {
        self.store.edges_of_type(edge_type)
    }

    pub fn by_label(&self, label: &str) -> Result<Vec<Node>> {
        self.store.find_by_label(label)
    }

    pub fn by_property(&self, key: &str, value: &Value) -> Result<Vec<Node>> {
        self.store.find_by_property(key, value)
    }

    /// Breadth-first spreading activation from `seeds` (§4.5 `spread`).
    /// Activation accumulates across multiple incoming paths, is clamped to
    /// never go negative, and halts at `max_hops` or once `max_nodes` distinct
    /// ids have been visited.
    ///
    /// §8 scenario 4: A --REFERENCES(0.8)--> B --RELATED_TO(0.7)--> C, seeded
    /// at A with activation 1.0, depth 2, decay 0.5, yields
    /// `a(B) = 1.0 * 0.8 * 0.5 = 0.40` and `a(C) = 0.40 * 0.7 * 0.5 = 0.14`.
    pub fn spread(
        &self,
        seeds: &[(NodeId, f64)],
        max_hops: u32,
        decay: f64,
        max_nodes: usize,
    ) -> Result<HashMap<NodeId, f64>> {
        let mut activation: HashMap<NodeId, f64> = HashMap::new();
        let mut frontier: VecDeque<(NodeId, f64, u32)> = VecDeque::new();

        for (id, seed_activation) in seeds {
            activation.insert(id.clone(), seed_activation.max(activation.get(id).copied().unwrap_or(0.0)));
            frontier.push_back((id.clone(), *seed_activation, 0));
        }

        while let Some((id, parent_activation, hop)) = frontier.pop_front() {
            if hop >= max_hops {
                continue;
            }
            if activation.len() >= max_nodes {
                break;
            }
            let neighbors = self.store.neighbors(&id, Direction::Both, None)?;
            for (neighbor_id, _edge_type, weight) in neighbors {
                if activation.len() >= max_nodes && !activation.contains_key(&neighbor_id) {
                    continue;
                }
                let propagated = (parent_activation * weight as f64 * decay).max(0.0);
                let entry = activation.entry(neighbor_id.clone()).or_insert(0.0);
                *entry += propagated;
                frontier.push_back((neighbor_id, propagated, hop + 1));
            }
        }

        // Seeds are reported at their starting activation, not accumulated
        // spread back onto themselves.
        for (id, seed_activation) in seeds {
            activation.insert(id.clone(), *seed_activation);
        }
        Ok(activation)
    }
}

/// Resolves a cross-reference token (a wikilink target, or a bare `ADR-007`
/// / `PAT-012` / `RN-3` / `EXP-9` style id) to a node id (§4.6 cross-reference
/// pass). Tries, in order: an exact 16-hex node id, an exact title match, a
/// title-prefix match, and finally a `props.<kind>_id` lookup for the known
/// reference-id properties. Returns `Ok(None)` — not an error — when nothing
/// resolves (§7 class 6: "counted in the cross-reference pass report").
pub fn resolve_reference(store: &Store, token: &str) -> Result<Option<NodeId>> {
    if token.len() == 16 && token.chars().all(|c| c.is_ascii_hexdigit()) {
        if store.get_node(token)?.is_some() {
            return Ok(Some(token.to_string()));
        }
    }
    if let Some(node) = store.find_by_title(token)? {
        return Ok(Some(node.id));
    }
    if let Some(node) = store.find_by_title_prefix(token)? {
        return Ok(Some(node.id));
    }
    for prop_key in ["adr_id", "pat_id", "exp_id", "rule_id"] {
        let hits = store.find_by_property(prop_key, &Value::String(token.to_string()))?;
        if let Some(node) = hits.into_iter().next() {
            return Ok(Some(node.id));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::model::Properties;

    use super::*;

    fn labels(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn spreading_activation_matches_spec_example() {
        let store = Store::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            store
                .upsert_node(id, id, id, &labels(&["Concept"]), &Properties::new(), false)
                .unwrap();
        }
        store
            .add_edge(&Edge::new("a", "b", EdgeType::References).with_weight(0.8))
            .unwrap();
        store
            .add_edge(&Edge::new("b", "c", EdgeType::RelatedTo).with_weight(0.7))
            .unwrap();

        let graph = GraphApi::new(&store);
        let activation = graph.spread(&[("a".to_string(), 1.0)], 2, 0.5, 200).unwrap();

        assert!((activation["b"] - 0.40).abs() < 1e-9);
        assert!((activation["c"] - 0.14).abs() < 1e-9);
    }

    #[test]
    fn spread_halts_at_max_nodes() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..10 {
            let id = format!("n{i}");
            store
                .upsert_node(&id, &id, &id, &labels(&["Concept"]), &Properties::new(), false)
                .unwrap();
        }
        for i in 0..9 {
            store
                .add_edge(&Edge::new(format!("n{i}"), format!("n{}", i + 1), EdgeType::RelatedTo))
                .unwrap();
        }
        let graph = GraphApi::new(&store);
        let activation = graph.spread(&[("n0".to_string(), 1.0)], 10, 0.9, 3).unwrap();
        assert!(activation.len() <= 3);
    }
}
