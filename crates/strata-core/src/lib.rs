//! Strata: a local-first organizational memory engine for software
//! projects (SPEC_FULL.md §0/§1).
//!
//! This crate is the knowledge-graph engine and its three coupled
//! subsystems: the graph store (§4.2–§4.3), the hybrid recall pipeline
//! (§4.7), and the sleep/consolidation pipeline (§4.8). It is library-shaped;
//! `strata-cli` is the thin recall boundary described in §6.3.
//!
//! The entry point is [`Strata`], opened via [`StrataConfig`]. Writes go
//! through [`Strata::add_memory`] or the adapters in [`ingest`]; reads go
//! through [`recall::recall`], [`Strata::graph`], or [`cognitive::health`].
//! [`sleep::run_sleep`] runs the offline consolidation phases.

pub mod cognitive;
pub mod config;
pub mod embeddings;
pub mod graph;
pub mod identity;
pub mod ingest;
pub mod memory;
pub mod model;
pub mod recall;
pub mod sleep;
pub mod storage;
pub mod vector;

pub use config::StrataConfig;
pub use memory::{MemoryError, Strata};
pub use model::{Direction, Edge, EdgeType, Node, NodeId, Properties};
