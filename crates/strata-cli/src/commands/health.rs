//! `strata health` — the §4.9 composite health score plus recommendations.

use std::process::ExitCode;

use clap::Args;
use colored::Colorize;

use strata_core::cognitive;
use strata_core::Strata;

use super::CmdResult;

#[derive(Args)]
pub struct HealthArgs {
    #[arg(long)]
    json: bool,
}

pub fn run(strata: &Strata, args: HealthArgs) -> CmdResult {
    let report = cognitive::health(strata)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    let score_str = format!("{:.2}", report.score);
    let colored_score = if report.score >= 0.7 {
        score_str.green()
    } else if report.score >= 0.4 {
        score_str.yellow()
    } else {
        score_str.red()
    };
    println!("health score: {colored_score}");
    println!("  weak ratio:            {:.2}", report.weak_ratio);
    println!("  semantic connectivity: {:.2}", report.semantic_connectivity);
    println!("  embedding coverage:    {:.2}", report.embedding_coverage);
    println!("  vector backend:        {}", report.vector_backend);
    println!("  embedder backend:      {}", report.embedder_backend);
    println!(
        "  code: {} modules, {} classes, {} functions, {} interfaces",
        report.code_coverage.modules, report.code_coverage.classes, report.code_coverage.functions, report.code_coverage.interfaces
    );
    println!(
        "  diff enrichment: {}/{} ({:.0}%)",
        report.diff_enrichment.enriched,
        report.diff_enrichment.total_commits,
        report.diff_enrichment.ratio * 100.0
    );
    if !report.recommendations.is_empty() {
        println!("  recommendations:");
        for rec in &report.recommendations {
            println!("    - [{}] {}", rec.category, rec.message);
        }
    }

    Ok(ExitCode::SUCCESS)
}
