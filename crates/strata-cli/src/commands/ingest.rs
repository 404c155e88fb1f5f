//! `strata ingest <adapter>` — drives the §4.6 adapters over a file or a git
//! repository. Each subcommand prints the resulting [`IngestReport`] as JSON
//! so a caller (or a human) can see counts and unresolved-reference warnings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Subcommand;

use strata_core::ingest::{self, CommitMode};
use strata_core::Strata;

use super::CmdResult;

#[derive(Subcommand)]
pub enum IngestCommand {
    /// Ingest a markdown ADR log (§6.2 `## ADR-NNN: <Title>`).
    Adrs { path: PathBuf },
    /// Ingest a markdown pattern/anti-pattern catalog (§6.2 `### PAT-NNN:`).
    Patterns { path: PathBuf },
    /// Ingest domain glossary/rule/entity markdown.
    Domain { path: PathBuf },
    /// Ingest a markdown experience log (§6.2 `### EXP-NNN:`).
    Experiences { path: PathBuf },
    /// Walk `git log` for a repository and upsert one Commit node per entry.
    Commits {
        repo: PathBuf,
        /// Use the lower incremental-refresh cap instead of the initial-populate cap.
        #[arg(long)]
        refresh: bool,
    },
    /// Re-run the cross-reference pass over the whole graph (§4.6, normally
    /// run automatically by `strata sleep`'s CONNECT phase).
    Xref,
}

pub fn run(strata: &Strata, command: IngestCommand) -> CmdResult {
    let report = match command {
        IngestCommand::Adrs { path } => ingest::ingest_adrs(strata, &std::fs::read_to_string(path)?)?,
        IngestCommand::Patterns { path } => ingest::ingest_patterns(strata, &std::fs::read_to_string(path)?)?,
        IngestCommand::Domain { path } => ingest::ingest_domain(strata, &std::fs::read_to_string(path)?)?,
        IngestCommand::Experiences { path } => ingest::ingest_experiences(strata, &std::fs::read_to_string(path)?)?,
        IngestCommand::Commits { repo, refresh } => {
            let mode = if refresh { CommitMode::Refresh } else { CommitMode::Initial };
            ingest::ingest_commits_from_repo(strata, &repo, mode)?
        }
        IngestCommand::Xref => ingest::run_cross_reference_pass(strata, None)?,
    };

    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    Ok(ExitCode::SUCCESS)
}
