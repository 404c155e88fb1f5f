//! `strata`: the recall CLI boundary (§6.3). The core engine is
//! library-shaped; this binary is a thin wrapper that parses flags, opens a
//! [`Strata`] handle, and prints the stable JSON schema (or a human-readable
//! rendering) to stdout.
//!
//! Exit codes, per §6.3: 0 success (including an empty result), 2 invalid
//! arguments, 3 store unavailable, 4 embedding backend unavailable (only when
//! the lexical fallback also fails, which in practice never happens here
//! since `keyword_search` has no external dependency — kept for contract
//! completeness).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use strata_core::{Strata, StrataConfig};

#[derive(Parser)]
#[command(name = "strata", version, about = "Local-first organizational memory engine for software projects")]
struct Cli {
    /// Store directory (defaults to the platform data dir; see StrataConfig::resolve_store_path).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hybrid recall over the graph (§4.7, §6.3).
    Recall(commands::recall::RecallArgs),
    /// Ingest adapters (§4.6).
    Ingest {
        #[command(subcommand)]
        adapter: commands::ingest::IngestCommand,
    },
    /// Run the sleep/consolidation pipeline (§4.8).
    Sleep(commands::sleep::SleepArgs),
    /// Report the composite health score and recommendations (§4.9).
    Health(commands::health::HealthArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = StrataConfig::default();
    if let Some(store) = cli.store {
        config = config.with_store_path(store);
    }

    let strata = match Strata::open(config) {
        Ok(strata) => strata,
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("store unavailable: {e}").as_str()));
            return ExitCode::from(3);
        }
    };

    let result = match cli.command {
        Command::Recall(args) => commands::recall::run(&strata, args),
        Command::Ingest { adapter } => commands::ingest::run(&strata, adapter),
        Command::Sleep(args) => commands::sleep::run(&strata, args),
        Command::Health(args) => commands::health::run(&strata, args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("error: {e}").as_str()));
            ExitCode::from(2)
        }
    }
}
