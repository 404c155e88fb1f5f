//! Request/response types for [`super::recall`] (§4.7, §6.3 JSON schema).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{EdgeType, NodeId};

/// Filters applied before scoring (§4.7 step 1).
#[derive(Debug, Clone, Default)]
pub struct RecallFilters {
    /// `--type` tag, resolved to a label set via [`super::type_filter_labels`].
    pub type_filter: Option<String>,
    /// `--recent N`: only nodes dated within the last N days.
    pub recent_days: Option<i64>,
    /// `--since DATE`: only nodes dated on or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// `--author`: matches `author`/`author_email` properties.
    pub author: Option<String>,
}

/// How to order the final result list once scored (§6.3 `--sort`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Relevance,
    Date,
}

/// Shaping knobs for a single recall call (§4.7 steps 5, 7, 8; §6.3 flags).
#[derive(Debug, Clone)]
pub struct RecallOptions {
    pub top: usize,
    pub depth: u32,
    pub sort: SortMode,
    /// Drop `content` from results not named in `expand` (see module docs
    /// for why `connections` are kept regardless).
    pub compact: bool,
    /// Node ids that keep full `content` even under `compact`.
    pub expand: Vec<NodeId>,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            top: 10,
            depth: 2,
            sort: SortMode::Relevance,
            compact: false,
            expand: Vec::new(),
        }
    }
}

/// One summarized neighbor attached to a result, letting a caller pivot
/// without another call (§4.7 step 7).
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: NodeId,
    pub title: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub weight: f32,
}

/// One ranked recall hit (§6.3 JSON schema).
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    pub id: NodeId,
    pub title: String,
    pub labels: Vec<String>,
    pub score: f64,
    pub date: Option<String>,
    /// `None` when compacted and not in `expand` (see module docs).
    pub content: Option<String>,
    pub summary: String,
    pub connections: Vec<Connection>,
}

/// Which concrete backends answered this call, surfaced for debuggability
/// (§6.3 schema, §8 scenario 6).
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub vector: &'static str,
    pub embedder: &'static str,
}

/// Full response envelope returned by [`super::recall`].
#[derive(Debug, Clone, Serialize)]
pub struct RecallResponse {
    pub query: Option<String>,
    /// Total candidates considered before truncation to `top`.
    pub total: usize,
    pub backend: BackendInfo,
    pub results: Vec<RecallResult>,
}
