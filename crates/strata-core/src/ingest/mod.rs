//! Ingest adapters (C6): turn external artifacts into node/edge records via
//! the memory façade.
//!
//! The adapters below implement the *logic* of §4.6 — the heading/wikilink
//! grammar of §6.2, the idempotence rules, the props each node type carries —
//! but not the artifacts' own parsing internals where those are explicitly
//! out of scope (the AST parser and the diff parser are external; this
//! module defines the Rust-typed contract they must hand records through,
//! per SPEC_FULL.md §0).
//!
//! Each adapter is idempotent: re-running it over the same input does not
//! grow the node count (identity is content-addressed, §4.1) and does not
//! duplicate edges (edge upsert is max-weight merge, §3).
//!
//! A note on transactionality (§9 "wrap each adapter run in one
//! transaction"): [`crate::storage::Store`]'s write lock is a single
//! non-reentrant mutex guarded per call, so a literal outer transaction
//! wrapping many `add_memory` calls would deadlock. Instead each record is
//! ingested through its own atomic call, which composes with §7 class 5's
//! per-record recovery policy (skip a malformed record, keep going) more
//! directly than an all-or-nothing transaction would. See DESIGN.md.

mod adrs;
mod code;
mod commits;
mod diff;
mod domain;
mod experiences;
mod patterns;
mod xref;

pub use adrs::ingest_adrs;
pub use code::{CodeSymbolKind, ModuleRecord, SymbolRecord, ingest_code_file};
pub use commits::{CommitMode, ingest_commits_from_repo};
pub use diff::{DiffEnrichment, enrich_commit_diff};
pub use domain::ingest_domain;
pub use experiences::ingest_experiences;
pub use patterns::ingest_patterns;
pub use xref::run_cross_reference_pass;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error(transparent)]
    Memory(#[from] crate::memory::MemoryError),

    #[error(transparent)]
    Store(#[from] crate::storage::StoreError),

    /// §7 class 1 adjacent — the external git repository itself could not be
    /// opened; this is caller-visible, unlike a single malformed commit.
    #[error("git repository error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Outcome of a single adapter run (§4.6, §7 class 5). Malformed individual
/// records are counted in `warnings`, never abort the run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IngestReport {
    pub nodes_ingested: usize,
    pub nodes_skipped: usize,
    pub edges_created: usize,
    /// Wikilink/id tokens that didn't resolve to any node (§7 class 6:
    /// counted, not an error).
    pub unresolved_references: usize,
    pub warnings: Vec<String>,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.nodes_ingested += other.nodes_ingested;
        self.nodes_skipped += other.nodes_skipped;
        self.edges_created += other.edges_created;
        self.unresolved_references += other.unresolved_references;
        self.warnings.extend(other.warnings);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "ingest: skipping malformed record");
        self.warnings.push(message);
        self.nodes_skipped += 1;
    }
}
