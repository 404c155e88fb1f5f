//! Domain adapter (§4.6): glossary terms, business rules, and entities from a
//! project's domain-language document.
//!
//! §6.2 only pins down the inline rule-id token grammar (`RN-(\d+)`), not a
//! heading grammar for this adapter specifically; headings below follow the
//! same `###`-per-entry convention as the Patterns/Experiences adapters,
//! with the rule heading carrying the `RN-NNN` id so inline `RN-12` mentions
//! elsewhere resolve to it during the cross-reference pass. See DESIGN.md.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::memory::Strata;

use super::{IngestReport, Result};

static GLOSSARY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+GLOSSARY:\s*(.+)$").unwrap());
static RULE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+RN-(\d+):\s*(.+)$").unwrap());
static ENTITY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+ENTITY:\s*(.+)$").unwrap());
static ANY_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^###\s+.+$").unwrap());

pub fn ingest_domain(strata: &Strata, markdown: &str) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let section_ends: Vec<usize> = ANY_HEADING.find_iter(markdown).map(|m| m.start()).collect();
    let body_end_after = |start: usize| {
        section_ends
            .iter()
            .find(|&&end| end > start)
            .copied()
            .unwrap_or(markdown.len())
    };

    for caps in GLOSSARY_HEADING.captures_iter(markdown) {
        let term = caps[1].trim();
        if term.is_empty() {
            report.warn("glossary entry has an empty term, skipping");
            continue;
        }
        let start = caps.get(0).unwrap().end();
        let body = markdown[start..body_end_after(start)].trim();
        strata.add_memory(term, body, &["Concept", "Glossary"], None, None, None, None)?;
        report.nodes_ingested += 1;
    }

    for caps in RULE_HEADING.captures_iter(markdown) {
        let num = &caps[1];
        let name = caps[2].trim();
        if name.is_empty() {
            report.warn(format!("RN-{num} has an empty title, skipping"));
            continue;
        }
        let start = caps.get(0).unwrap().end();
        let body = markdown[start..body_end_after(start)].trim();
        let title = format!("RN-{num}: {name}");
        let mut properties = crate::model::Properties::new();
        properties.insert("rule_id".to_string(), json!(format!("RN-{num}")));
        strata.add_memory(
            &title,
            body,
            &["Concept", "Rule", "BusinessRule"],
            Some(properties),
            None,
            None,
            None,
        )?;
        report.nodes_ingested += 1;
    }

    for caps in ENTITY_HEADING.captures_iter(markdown) {
        let name = caps[1].trim();
        if name.is_empty() {
            report.warn("entity entry has an empty name, skipping");
            continue;
        }
        let start = caps.get(0).unwrap().end();
        let body = markdown[start..body_end_after(start)].trim();
        strata.add_memory(name, body, &["Concept", "Entity"], None, None, None, None)?;
        report.nodes_ingested += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    const SAMPLE: &str = "\
### GLOSSARY: Tenant

A customer organization with isolated data.

### RN-012: Invoices must balance

Sum of line items must equal the invoice total.

### ENTITY: Invoice

A billing document issued to a tenant.
";

    #[test]
    fn ingests_all_three_domain_kinds() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let report = ingest_domain(&strata, SAMPLE).unwrap();
        assert_eq!(report.nodes_ingested, 3);

        let glossary = strata.store().find_by_title_labels("Tenant", &["Concept", "Glossary"]).unwrap().unwrap();
        assert!(glossary.labels.contains("Glossary"));

        let rule = strata
            .store()
            .find_by_title_labels("RN-012: Invoices must balance", &["Concept", "Rule", "BusinessRule"])
            .unwrap()
            .unwrap();
        assert!(rule.labels.contains("BusinessRule"));

        let entity = strata.store().find_by_title_labels("Invoice", &["Concept", "Entity"]).unwrap().unwrap();
        assert!(entity.labels.contains("Entity"));
    }
}
