//! Core data model: nodes, edges, labels, and properties.
//!
//! Mirrors spec §3: a node is a unit of remembered information identified by
//! a content-addressed id, carrying a label set, an open property map, and
//! (optionally) an embedding stored in the vector index. An edge is a
//! directed, typed relation between two node ids with a monotone weight.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node id: 16 lowercase hex characters, deterministic from (title, labels)
/// or from a caller-supplied canonical string for sub-symbol code nodes.
/// See [`crate::identity`].
pub type NodeId = String;

/// Open property map. Values are small scalars or small JSON arrays; callers
/// are responsible for keeping documents small (properties are not meant to
/// hold the node's primary content — that belongs in `Node::content`).
pub type Properties = serde_json::Map<String, Value>;

/// A unit of remembered information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub content: String,
    /// Unordered label set; every node has at least one label (§3 invariants).
    pub labels: BTreeSet<String>,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            labels: BTreeSet::new(),
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// The primary label drives decay rate and display policy (§3, §4.9).
    /// Policy nodes (`Person`, `Decision`/`ADR`, ...) are checked in a fixed
    /// order; the first label present in that order wins.
    pub fn primary_label(&self) -> PrimaryLabel {
        const POLICY_ORDER: &[(&str, PrimaryLabel)] = &[
            ("Person", PrimaryLabel::Person),
            ("Decision", PrimaryLabel::Decision),
            ("ADR", PrimaryLabel::Decision),
            ("Pattern", PrimaryLabel::Pattern),
            ("ApprovedPattern", PrimaryLabel::Pattern),
            ("AntiPattern", PrimaryLabel::Pattern),
            ("Episode", PrimaryLabel::Episode),
            ("Commit", PrimaryLabel::Episode),
            ("Experience", PrimaryLabel::Episode),
            ("BugFix", PrimaryLabel::Episode),
            ("Concept", PrimaryLabel::Concept),
            ("Glossary", PrimaryLabel::Concept),
            ("Rule", PrimaryLabel::Concept),
            ("Theme", PrimaryLabel::Theme),
            ("PatternCluster", PrimaryLabel::Cluster),
            ("Module", PrimaryLabel::Code),
            ("Class", PrimaryLabel::Code),
            ("Function", PrimaryLabel::Code),
            ("Interface", PrimaryLabel::Code),
            ("Code", PrimaryLabel::Code),
        ];
        for (name, primary) in POLICY_ORDER {
            if self.labels.contains(*name) {
                return *primary;
            }
        }
        PrimaryLabel::Other
    }

    pub fn is_archived(&self) -> bool {
        self.labels.contains("Archived")
    }

    pub fn is_weak(&self) -> bool {
        self.labels.contains("WeakMemory")
    }

    pub fn strength(&self) -> f64 {
        self.properties
            .get("strength")
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
    }

    pub fn set_strength(&mut self, value: f64) {
        self.properties
            .insert("strength".to_string(), Value::from(value.clamp(0.0, 1.0)));
    }
}

/// Decay-rate policy bucket derived from a node's primary label (§3 invariants,
/// "decay typing"). Values are per-day rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryLabel {
    Person,
    Decision,
    Pattern,
    Episode,
    Concept,
    Code,
    Theme,
    Cluster,
    Other,
}

impl PrimaryLabel {
    /// Per-day decay rate for this label bucket (spec §3: "decay typing").
    pub fn decay_rate(self) -> f64 {
        match self {
            PrimaryLabel::Person => 1e-4,
            PrimaryLabel::Decision => 1e-3,
            PrimaryLabel::Pattern => 5e-3,
            PrimaryLabel::Episode => 1e-2,
            PrimaryLabel::Concept => 3e-3,
            PrimaryLabel::Code => 1e-3,
            // Themes/clusters are synthesized, not authored; treat them like
            // concepts since they summarize stable groupings.
            PrimaryLabel::Theme | PrimaryLabel::Cluster => 3e-3,
            PrimaryLabel::Other => 1e-2,
        }
    }
}

/// Closed set of edge types with a semantic contract and a type-specific
/// default weight (§3).
///
/// Serializes in SCREAMING_SNAKE_CASE (`REFERENCES`, `CO_ACCESSED`, ...) to
/// match [`EdgeType::as_str`] and the §6.3 stable JSON schema's `connections[].type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    AuthoredBy,
    BelongsTo,
    References,
    InformedBy,
    Applies,
    RelatedTo,
    SameScope,
    ModifiesSame,
    BelongsToTheme,
    ClusteredIn,
    CoAccessed,
    Defines,
    Imports,
    Inherits,
    Implements,
    MemberOf,
    Modifies,
}

impl EdgeType {
    pub fn default_weight(self) -> f32 {
        match self {
            EdgeType::AuthoredBy => 0.9,
            EdgeType::BelongsTo => 0.7,
            EdgeType::References => 0.8,
            EdgeType::InformedBy => 0.7,
            EdgeType::Applies => 0.7,
            EdgeType::RelatedTo => 0.6,
            EdgeType::SameScope => 0.6,
            EdgeType::ModifiesSame => 0.5,
            EdgeType::BelongsToTheme => 0.6,
            EdgeType::ClusteredIn => 0.6,
            EdgeType::CoAccessed => 0.4,
            EdgeType::Defines => 0.8,
            EdgeType::Imports => 0.5,
            EdgeType::Inherits => 0.7,
            EdgeType::Implements => 0.7,
            EdgeType::MemberOf => 0.8,
            EdgeType::Modifies => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::AuthoredBy => "AUTHORED_BY",
            EdgeType::BelongsTo => "BELONGS_TO",
            EdgeType::References => "REFERENCES",
            EdgeType::InformedBy => "INFORMED_BY",
            EdgeType::Applies => "APPLIES",
            EdgeType::RelatedTo => "RELATED_TO",
            EdgeType::SameScope => "SAME_SCOPE",
            EdgeType::ModifiesSame => "MODIFIES_SAME",
            EdgeType::BelongsToTheme => "BELONGS_TO_THEME",
            EdgeType::ClusteredIn => "CLUSTERED_IN",
            EdgeType::CoAccessed => "CO_ACCESSED",
            EdgeType::Defines => "DEFINES",
            EdgeType::Imports => "IMPORTS",
            EdgeType::Inherits => "INHERITS",
            EdgeType::Implements => "IMPLEMENTS",
            EdgeType::MemberOf => "MEMBER_OF",
            EdgeType::Modifies => "MODIFIES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "AUTHORED_BY" => EdgeType::AuthoredBy,
            "BELONGS_TO" => EdgeType::BelongsTo,
            "REFERENCES" => EdgeType::References,
            "INFORMED_BY" => EdgeType::InformedBy,
            "APPLIES" => EdgeType::Applies,
            "RELATED_TO" => EdgeType::RelatedTo,
            "SAME_SCOPE" => EdgeType::SameScope,
            "MODIFIES_SAME" => EdgeType::ModifiesSame,
            "BELONGS_TO_THEME" => EdgeType::BelongsToTheme,
            "CLUSTERED_IN" => EdgeType::ClusteredIn,
            "CO_ACCESSED" => EdgeType::CoAccessed,
            "DEFINES" => EdgeType::Defines,
            "IMPORTS" => EdgeType::Imports,
            "INHERITS" => EdgeType::Inherits,
            "IMPLEMENTS" => EdgeType::Implements,
            "MEMBER_OF" => EdgeType::MemberOf,
            "MODIFIES" => EdgeType::Modifies,
            _ => return None,
        })
    }

    /// Connection-shaping priority order used by recall (§4.7 step 7), lower
    /// is higher priority.
    pub fn connection_priority(self) -> u8 {
        match self {
            EdgeType::References => 0,
            EdgeType::InformedBy => 1,
            EdgeType::Applies => 2,
            EdgeType::SameScope => 3,
            EdgeType::ModifiesSame => 4,
            EdgeType::RelatedTo => 5,
            EdgeType::BelongsToTheme => 6,
            EdgeType::ClusteredIn => 7,
            EdgeType::CoAccessed => 8,
            _ => 9,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub edge_type: EdgeType,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, edge_type: EdgeType) -> Self {
        let now = Utc::now();
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            edge_type,
            weight: edge_type.default_weight(),
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// Which direction(s) to traverse from a node in [`crate::graph::GraphApi::neighbors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_label_policy_order() {
        let node = Node::new("abc", "t", "c").with_labels(["Episode", "Commit", "Code"]);
        // Episode comes before Code in the policy order.
        assert_eq!(node.primary_label(), PrimaryLabel::Episode);
    }

    #[test]
    fn decay_rates_match_spec() {
        assert_eq!(PrimaryLabel::Person.decay_rate(), 1e-4);
        assert_eq!(PrimaryLabel::Decision.decay_rate(), 1e-3);
        assert_eq!(PrimaryLabel::Pattern.decay_rate(), 5e-3);
        assert_eq!(PrimaryLabel::Episode.decay_rate(), 1e-2);
        assert_eq!(PrimaryLabel::Concept.decay_rate(), 3e-3);
        assert_eq!(PrimaryLabel::Code.decay_rate(), 1e-3);
    }

    #[test]
    fn edge_type_roundtrip() {
        for et in [
            EdgeType::AuthoredBy,
            EdgeType::References,
            EdgeType::RelatedTo,
            EdgeType::Modifies,
        ] {
            assert_eq!(EdgeType::parse(et.as_str()), Some(et));
        }
    }

    #[test]
    fn strength_defaults_and_clamps() {
        let mut node = Node::new("abc", "t", "c");
        assert_eq!(node.strength(), 1.0);
        node.set_strength(1.5);
        assert_eq!(node.strength(), 1.0);
        node.set_strength(-0.5);
        assert_eq!(node.strength(), 0.0);
    }
}
