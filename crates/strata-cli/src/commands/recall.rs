//! `strata recall` — the §6.3 CLI contract over [`strata_core::recall`].

use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use colored::Colorize;

use strata_core::recall::{self, RecallFilters, RecallOptions, RecallResponse, SortMode as CoreSortMode};
use strata_core::Strata;

use super::{CliError, CmdResult};

#[derive(Clone, Copy, Default, ValueEnum)]
enum SortArg {
    #[default]
    Relevance,
    Date,
}

impl std::fmt::Display for SortArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SortArg::Relevance => "relevance",
            SortArg::Date => "date",
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Human,
}

#[derive(Args)]
pub struct RecallArgs {
    /// Free-text query; omit for a pure filter listing (§4.7 step 1).
    query: Option<String>,

    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Canonical type tag (adr, pattern, commit, function, code, ...).
    #[arg(long = "type")]
    type_filter: Option<String>,

    /// Only nodes dated/accessed within the last N days.
    #[arg(long)]
    recent: Option<String>,

    /// Only nodes dated on or after this ISO date (YYYY-MM-DD).
    #[arg(long)]
    since: Option<String>,

    #[arg(long)]
    author: Option<String>,

    #[arg(long, value_enum, default_value_t = SortArg::Relevance)]
    sort: SortArg,

    #[arg(long, default_value_t = 2)]
    depth: u32,

    #[arg(long)]
    compact: bool,

    #[arg(long, value_delimiter = ',')]
    expand: Vec<String>,

    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    format: FormatArg,
}

/// Parses `--recent Nd` (e.g. `30d`) into a day count (§6.2/§6.3).
fn parse_recent_days(raw: &str) -> Result<i64, CliError> {
    let trimmed = raw.trim().trim_end_matches(['d', 'D']);
    trimmed
        .parse::<i64>()
        .map_err(|_| CliError::InvalidArgument(format!("--recent expects e.g. '30d', got '{raw}'")))
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| DateTime::from_naive_utc_and_offset(d.and_hms_opt(0, 0, 0).unwrap(), Utc))
        .map_err(|_| CliError::InvalidArgument(format!("--since expects YYYY-MM-DD, got '{raw}'")))
}

pub fn run(strata: &Strata, args: RecallArgs) -> CmdResult {
    let recent_days = args.recent.as_deref().map(parse_recent_days).transpose()?;
    let since = args.since.as_deref().map(parse_since).transpose()?;

    let filters = RecallFilters {
        type_filter: args.type_filter,
        recent_days,
        since,
        author: args.author,
    };

    let options = RecallOptions {
        top: args.top,
        depth: args.depth.max(1),
        sort: match args.sort {
            SortArg::Relevance => CoreSortMode::Relevance,
            SortArg::Date => CoreSortMode::Date,
        },
        compact: args.compact,
        expand: args.expand,
    };

    let response = recall::recall(strata, args.query.as_deref(), &filters, &options)?;

    match args.format {
        FormatArg::Json => print_json(&response)?,
        FormatArg::Human => print_human(&response),
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json(response: &RecallResponse) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(response).map_err(|e| CliError::InvalidArgument(e.to_string()))?);
    Ok(())
}

fn print_human(response: &RecallResponse) {
    if response.results.is_empty() {
        println!("{}", "no results".dimmed());
        return;
    }
    for result in &response.results {
        let labels = result.labels.join(", ");
        println!("{}  {}  [{}]", result.score.to_string().green().bold(), result.title.bold(), labels.dimmed());
        if let Some(content) = &result.content {
            println!("    {}", content.lines().next().unwrap_or(""));
        } else {
            println!("    {}", result.summary);
        }
        for connection in &result.connections {
            println!("    -> {} {} ({:.2})", connection.edge_type, connection.title, connection.weight);
        }
    }
    println!("{}", format!("{} of {} candidates", response.results.len(), response.total).dimmed());
}
