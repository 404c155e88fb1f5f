//! `strata sleep` — runs the §4.8 consolidation pipeline to completion.
//!
//! The core engine's cancellation flag (§5) is exposed for embedders that
//! want to interrupt a long-running sleep from another thread; this CLI
//! boundary doesn't install a signal handler and always runs to completion.

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Args;

use strata_core::sleep;
use strata_core::Strata;

use super::CmdResult;

#[derive(Args)]
pub struct SleepArgs {
    /// Print each phase's counts as it completes instead of only the final summary.
    #[arg(long)]
    verbose: bool,
}

pub fn run(strata: &Strata, args: SleepArgs) -> CmdResult {
    let cancel = AtomicBool::new(false);
    let report = sleep::run_sleep(strata, &cancel)?;

    if args.verbose {
        for phase in &report.phases {
            println!(
                "{:<10} merged={} edges={} clusters={} archived={} hubs={}",
                phase.phase, phase.nodes_merged, phase.edges_added, phase.clusters_formed, phase.archived, phase.hubs.len()
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());

    Ok(ExitCode::SUCCESS)
}
