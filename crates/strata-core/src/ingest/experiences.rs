//! Experiences adapter (§4.6, §6.2): `### EXP-NNN: <Title>` → `[Episode, Experience]`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::memory::Strata;

use super::{IngestReport, Result};

static EXP_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+EXP-(\d+):\s*(.+)$").unwrap());

pub fn ingest_experiences(strata: &Strata, markdown: &str) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let headings: Vec<_> = EXP_HEADING.captures_iter(markdown).collect();

    for (i, caps) in headings.iter().enumerate() {
        let num = &caps[1];
        let title_text = caps[2].trim();
        if title_text.is_empty() {
            report.warn(format!("EXP-{num} has an empty title, skipping"));
            continue;
        }
        let body_start = caps.get(0).unwrap().end();
        let body_end = headings
            .get(i + 1)
            .map(|n| n.get(0).unwrap().start())
            .unwrap_or(markdown.len());
        let body = markdown[body_start..body_end].trim();

        let title = format!("EXP-{num}: {title_text}");
        let mut properties = crate::model::Properties::new();
        properties.insert("exp_id".to_string(), json!(format!("EXP-{num}")));

        strata.add_memory(
            &title,
            body,
            &["Episode", "Experience"],
            Some(properties),
            None,
            None,
            None,
        )?;
        report.nodes_ingested += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    #[test]
    fn ingests_experience_sections() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let markdown = "### EXP-004: Migrating off the legacy queue\n\nWhat we learned.\n";
        let report = ingest_experiences(&strata, markdown).unwrap();
        assert_eq!(report.nodes_ingested, 1);
        let node = strata
            .store()
            .find_by_title_labels("EXP-004: Migrating off the legacy queue", &["Episode", "Experience"])
            .unwrap()
            .unwrap();
        assert!(node.content.contains("What we learned"));
    }
}
