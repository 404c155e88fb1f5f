//! Commits adapter (§4.6, §6.2): one `[Episode, Commit]` node per commit in
//! `git log`, traversed with `git2` (genuinely in-scope per SPEC_FULL.md §0 —
//! distinct from the out-of-scope diff parser that only supplies enrichment
//! payloads, §4.6 "Diff enrichment").

use std::sync::LazyLock;

use chrono::{TimeZone, Utc};
use git2::{Repository, Sort};
use regex::Regex;
use serde_json::json;

use crate::memory::Strata;

use super::{IngestError, IngestReport, Result};

static CONVENTIONAL_SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(\(([^)]+)\))?:").unwrap());

/// Whether this run is the initial populate (higher commit cap) or an
/// incremental refresh (lower cap), per §4.6's configurable caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Initial,
    Refresh,
}

/// Walks `repo_path`'s `git log` (newest first) and upserts a Commit node per
/// entry, capped by [`CommitMode`] via `strata`'s config (§4.6).
pub fn ingest_commits_from_repo(
    strata: &Strata,
    repo_path: &std::path::Path,
    mode: CommitMode,
) -> Result<IngestReport> {
    let repo = Repository::open(repo_path).map_err(|e| IngestError::Git(e.to_string()))?;
    let mut report = IngestReport::default();

    let cap = match mode {
        CommitMode::Initial => strata.config().commits_initial_cap,
        CommitMode::Refresh => strata.config().commits_refresh_cap,
    };

    let mut revwalk = repo.revwalk().map_err(|e| IngestError::Git(e.to_string()))?;
    revwalk.push_head().map_err(|e| IngestError::Git(e.to_string()))?;
    revwalk
        .set_sorting(Sort::TIME)
        .map_err(|e| IngestError::Git(e.to_string()))?;

    for oid in revwalk.take(cap) {
        let oid = match oid {
            Ok(oid) => oid,
            Err(e) => {
                report.warn(format!("revwalk entry unreadable: {e}"));
                continue;
            }
        };
        let commit = match repo.find_commit(oid) {
            Ok(c) => c,
            Err(e) => {
                report.warn(format!("commit {oid} unreadable: {e}"));
                continue;
            }
        };

        let hash = oid.to_string();
        let message = commit.message().unwrap_or("").to_string();
        let mut lines = message.splitn(2, '\n');
        let subject = lines.next().unwrap_or("").trim().to_string();
        let body = lines.next().unwrap_or("").trim().to_string();

        if subject.is_empty() {
            report.warn(format!("commit {hash} has an empty subject, skipping"));
            continue;
        }

        let files = changed_files(&repo, &commit);
        let scope = CONVENTIONAL_SCOPE
            .captures(&subject)
            .and_then(|c| c.get(3).or_else(|| c.get(1)))
            .map(|m| m.as_str().to_string());

        let author = commit.author();
        let author_email = author.email().unwrap_or("").to_string();
        let date = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        let mut content = subject.clone();
        if !body.is_empty() {
            content.push_str("\n\n");
            content.push_str(&body);
        }
        if !files.is_empty() {
            content.push_str("\n\nFiles changed:\n");
            for f in &files {
                content.push_str("- ");
                content.push_str(f);
                content.push('\n');
            }
        }

        let mut properties = crate::model::Properties::new();
        properties.insert("commit_hash".to_string(), json!(hash));
        properties.insert("author_email".to_string(), json!(author_email));
        properties.insert("date".to_string(), json!(date));
        if let Some(scope) = &scope {
            properties.insert("scope".to_string(), json!(scope));
        }
        properties.insert("files".to_string(), json!(files));

        strata.add_memory(
            &subject,
            &content,
            &["Episode", "Commit"],
            Some(properties),
            Some(&author_email),
            None,
            None,
        )?;
        report.nodes_ingested += 1;
    }

    Ok(report)
}

fn changed_files(repo: &Repository, commit: &git2::Commit) -> Vec<String> {
    let tree = match commit.tree() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };
    let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
    let diff = match repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None) {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };
    diff.deltas()
        .filter_map(|delta| delta.new_file().path().map(|p| p.to_string_lossy().into_owned()))
        .collect()
}
