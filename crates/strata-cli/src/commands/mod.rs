pub mod health;
pub mod ingest;
pub mod recall;
pub mod sleep;

use std::process::ExitCode;

/// Every subcommand returns this: either the process exit code it wants, or
/// an error the top-level handler renders and maps to exit code 2 (§6.3:
/// "2 invalid arguments" covers malformed input discovered after parsing,
/// e.g. an unreadable ingest file).
pub type CmdResult = Result<ExitCode, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Recall(#[from] strata_core::recall::RecallError),

    #[error(transparent)]
    Ingest(#[from] strata_core::ingest::IngestError),

    #[error(transparent)]
    Sleep(#[from] strata_core::sleep::SleepError),

    #[error(transparent)]
    Cognitive(#[from] strata_core::cognitive::CognitiveError),

    #[error(transparent)]
    Store(#[from] strata_core::storage::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
