//! Decisions/ADRs adapter (§4.6, §6.2).
//!
//! Section grammar: `^##\s+ADR-(\d+):\s*(.+)$` opens a section; its body runs
//! until the next `^##\s` heading or EOF. Optional `Status:`/`Date:` lines
//! and an `Alternatives:` bullet list are captured into properties when
//! present; everything else is just body text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::memory::Strata;

use super::{IngestReport, Result};

static ADR_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+ADR-(\d+):\s*(.+)$").unwrap());
static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*Status:\s*(.+)$").unwrap());
static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mi)^\s*Date:\s*(.+)$").unwrap());
static ALTERNATIVES_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*Alternatives:\s*\n((?:\s*[-*]\s*.+\n?)+)").unwrap()
});
static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-*]\s*(.+)$").unwrap());

/// Parses a markdown ADR log and upserts one node per `## ADR-NNN: <Title>`
/// section (§4.6 Decisions/ADRs adapter).
pub fn ingest_adrs(strata: &Strata, markdown: &str) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let headings: Vec<_> = ADR_HEADING.captures_iter(markdown).collect();

    for (i, caps) in headings.iter().enumerate() {
        let whole_match = caps.get(0).unwrap();
        let adr_num = &caps[1];
        let title_text = caps[2].trim();

        let body_start = whole_match.end();
        let body_end = headings
            .get(i + 1)
            .map(|next| next.get(0).unwrap().start())
            .unwrap_or(markdown.len());
        let body = markdown[body_start..body_end].trim();

        if title_text.is_empty() {
            report.warn(format!("ADR-{adr_num} has an empty title, skipping"));
            continue;
        }

        let title = format!("ADR-{adr_num}: {title_text}");
        let mut properties = crate::model::Properties::new();
        properties.insert("adr_id".to_string(), json!(format!("ADR-{adr_num}")));
        if let Some(status) = STATUS_LINE.captures(body).and_then(|c| c.get(1)) {
            properties.insert("status".to_string(), json!(status.as_str().trim()));
        }
        if let Some(date) = DATE_LINE.captures(body).and_then(|c| c.get(1)) {
            properties.insert("date".to_string(), json!(date.as_str().trim()));
        }
        if let Some(block) = ALTERNATIVES_BLOCK.captures(body).and_then(|c| c.get(1)) {
            let alternatives: Vec<String> = BULLET_LINE
                .captures_iter(block.as_str())
                .map(|c| c[1].trim().to_string())
                .collect();
            if !alternatives.is_empty() {
                properties.insert("alternatives".to_string(), json!(alternatives));
            }
        }

        strata.add_memory(
            &title,
            body,
            &["Decision", "ADR"],
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

    const SAMPLE: &str = "\
# Architecture Decisions

## ADR-007: Use an embedded store

Status: accepted
Date: 2024-03-01

Context: we need a local-first store with no server process.

Decision: chosen backend is SQLite with FTS5.

Alternatives:
- Postgres: too heavy for a local-first tool
- Flat files: no query support

## ADR-008: Adopt WAL mode

Status: proposed

Context: concurrent readers must not block the writer.
";

    #[test]
    fn ingests_one_node_per_adr_section() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let report = ingest_adrs(&strata, SAMPLE).unwrap();
        assert_eq!(report.nodes_ingested, 2);

        let node = strata
            .store()
            .find_by_title_labels("ADR-007: Use an embedded store", &["Decision", "ADR"])
            .unwrap()
            .unwrap();
        assert!(node.content.contains("chosen backend is SQLite"));
        assert_eq!(node.properties["status"], "accepted");
        assert_eq!(node.properties["alternatives"][0], "Postgres: too heavy for a local-first tool");
    }

    #[test]
    fn rerun_is_idempotent() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        ingest_adrs(&strata, SAMPLE).unwrap();
        ingest_adrs(&strata, SAMPLE).unwrap();
        assert_eq!(strata.store().find_by_label("ADR").unwrap().len(), 2);
    }
}
