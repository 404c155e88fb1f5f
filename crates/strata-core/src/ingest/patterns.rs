//! Patterns adapter (§4.6, §6.2).
//!
//! `### PAT-NNN: <Name>` sections become `[Pattern, ApprovedPattern]` nodes.
//! `### ANTI-NNN: <Name>` sections nested under a "Anti-Padrões"/"Anti-patterns"
//! `##` section become `[Pattern, AntiPattern]` nodes instead.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::memory::Strata;

use super::{IngestReport, Result};

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##\s+(.+)$").unwrap());
static ANTI_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)anti-?padr[oõ]es|anti-?patterns?").unwrap());
static PAT_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+PAT-(\d+):\s*(.+)$").unwrap());
static ANTI_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+ANTI-(\d+):\s*(.+)$").unwrap());

/// Parses a markdown pattern catalog, distinguishing approved patterns from
/// anti-patterns by which `##` section a `###` entry falls under (§4.6,
/// §6.2: ANTI-NNN entries live "under a `## Anti-?Padr[oõ]es` section").
pub fn ingest_patterns(strata: &Strata, markdown: &str) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    // §2 heading boundaries bound every §3 PAT/ANTI heading's containing section.
    let section_bounds: Vec<(usize, usize, bool)> = {
        let headings: Vec<_> = SECTION_HEADING.captures_iter(markdown).collect();
        headings
            .iter()
            .enumerate()
            .map(|(i, caps)| {
                let start = caps.get(0).unwrap().start();
                let end = headings
                    .get(i + 1)
                    .map(|n| n.get(0).unwrap().start())
                    .unwrap_or(markdown.len());
                let is_anti_section = ANTI_SECTION.is_match(&caps[1]);
                (start, end, is_anti_section)
            })
            .collect()
    };
    let in_anti_section = |pos: usize| {
        section_bounds
            .iter()
            .any(|(start, end, is_anti)| *is_anti && pos >= *start && pos < *end)
    };

    ingest_headed_sections(
        strata,
        markdown,
        &PAT_HEADING,
        "PAT",
        &["Pattern", "ApprovedPattern"],
        "pat_id",
        &mut report,
    )?;
    ingest_anti_patterns(strata, markdown, &in_anti_section, &mut report)?;

    Ok(report)
}

fn ingest_headed_sections(
    strata: &Strata,
    markdown: &str,
    heading_re: &Regex,
    prefix: &str,
    labels: &[&str],
    id_prop: &str,
    report: &mut IngestReport,
) -> Result<()> {
    let headings: Vec<_> = heading_re.captures_iter(markdown).collect();
    for (i, caps) in headings.iter().enumerate() {
        let num = &caps[1];
        let name = caps[2].trim();
        if name.is_empty() {
            report.warn(format!("{prefix}-{num} has an empty name, skipping"));
            continue;
        }
        let body_start = caps.get(0).unwrap().end();
        let body_end = headings
            .get(i + 1)
            .map(|n| n.get(0).unwrap().start())
            .unwrap_or(markdown.len());
        let body = markdown[body_start..body_end].trim();

        let title = format!("{prefix}-{num}: {name}");
        let mut properties = crate::model::Properties::new();
        properties.insert(id_prop.to_string(), json!(format!("{prefix}-{num}")));

        strata.add_memory(&title, body, labels, Some(properties), None, None, None)?;
        report.nodes_ingested += 1;
    }
    Ok(())
}

fn ingest_anti_patterns(
    strata: &Strata,
    markdown: &str,
    in_anti_section: impl Fn(usize) -> bool,
    report: &mut IngestReport,
) -> Result<()> {
    let headings: Vec<_> = ANTI_HEADING.captures_iter(markdown).collect();
    for (i, caps) in headings.iter().enumerate() {
        let pos = caps.get(0).unwrap().start();
        if !in_anti_section(pos) {
            report.warn(format!(
                "ANTI-{} found outside an anti-pattern section, skipping",
                &caps[1]
            ));
            continue;
        }
        let num = &caps[1];
        let name = caps[2].trim();
        if name.is_empty() {
            report.warn(format!("ANTI-{num} has an empty name, skipping"));
            continue;
        }
        let body_start = caps.get(0).unwrap().end();
        let body_end = headings
            .get(i + 1)
            .map(|n| n.get(0).unwrap().start())
            .unwrap_or(markdown.len());
        let body = markdown[body_start..body_end].trim();

        let title = format!("ANTI-{num}: {name}");
        let mut properties = crate::model::Properties::new();
        properties.insert("pat_id".to_string(), json!(format!("ANTI-{num}")));

        strata.add_memory(
            &title,
            body,
            &["Pattern", "AntiPattern"],
            Some(properties),
            None,
            None,
            None,
        )?;
        report.nodes_ingested += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    const SAMPLE: &str = "\
## Approved Patterns

### PAT-012: Repository-per-aggregate

Keep one repository per aggregate root.

## Anti-Padrões

### ANTI-003: God object

Avoid concentrating unrelated responsibilities in one type.
";

    #[test]
    fn patterns_and_anti_patterns_get_distinct_labels() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let report = ingest_patterns(&strata, SAMPLE).unwrap();
        assert_eq!(report.nodes_ingested, 2);

        let pattern = strata
            .store()
            .find_by_title_labels("PAT-012: Repository-per-aggregate", &["Pattern", "ApprovedPattern"])
            .unwrap()
            .unwrap();
        assert!(pattern.labels.contains("ApprovedPattern"));

        let anti = strata
            .store()
            .find_by_title_labels("ANTI-003: God object", &["Pattern", "AntiPattern"])
            .unwrap()
            .unwrap();
        assert!(anti.labels.contains("AntiPattern"));
    }

    #[test]
    fn anti_heading_outside_anti_section_is_skipped() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let markdown = "## Somewhere Else\n\n### ANTI-099: Stray entry\n\nbody\n";
        let report = ingest_patterns(&strata, markdown).unwrap();
        assert_eq!(report.nodes_ingested, 0);
        assert_eq!(report.nodes_skipped, 1);
    }
}
