//! Cross-reference pass (§4.6 last paragraph, §8 "Cross-reference round-trip").
//!
//! Runs after the per-adapter ingests (once per adapter run over just the
//! new batch, or over the whole graph from sleep's CONNECT phase, §4.8 step
//! 2) and resolves `[[wikilink]]` and bare `ADR-\d+`/`PAT-\d+`/`RN-\d+`/
//! `EXP-\d+` tokens found in node content into `REFERENCES` edges.

use std::sync::LazyLock;

use regex::Regex;

use crate::graph;
use crate::memory::Strata;
use crate::model::{Edge, EdgeType};

use super::{IngestReport, Result};

static WIKILINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:ADR|PAT|RN|EXP)-\d+\b").unwrap());

/// Scans every node in the store (or just `node_ids`, when given) for
/// cross-reference tokens and creates `REFERENCES` edges to whatever they
/// resolve to. Unresolved tokens are counted, never errored (§7 class 6).
pub fn run_cross_reference_pass(strata: &Strata, node_ids: Option<&[String]>) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let ids = match node_ids {
        Some(ids) => ids.to_vec(),
        None => strata.store().all_node_ids()?,
    };

    for id in ids {
        let Some(node) = strata.store().get_node(&id)? else { continue };
        let mut tokens: Vec<String> = WIKILINK
            .captures_iter(&node.content)
            .map(|c| c[1].trim().to_string())
            .collect();
        tokens.extend(BARE_ID.find_iter(&node.content).map(|m| m.as_str().to_string()));

        for token in tokens {
            match graph::resolve_reference(strata.store(), &token)? {
                Some(target_id) if target_id != node.id => {
                    strata.store().add_edge(&Edge::new(node.id.clone(), target_id, EdgeType::References))?;
                    report.edges_created += 1;
                }
                Some(_) => {}
                None => {
                    report.unresolved_references += 1;
                }
            }
        }
    }

    Ok(report)
}
