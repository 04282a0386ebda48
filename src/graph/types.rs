//! Knowledge graph data types.
//!
//! These mirror the JSON shape the host hands over: nodes with a closed set
//! of entity types, and directed edges whose relationship kind is open.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity category of a node.
///
/// The set is closed: unknown tags fail deserialization rather than being
/// passed through as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A source document.
    Source,
    /// A person.
    Person,
    /// An organization.
    Organization,
    /// A geographic place.
    Place,
    /// An event.
    Event,
    /// A claim made by someone.
    Claim,
    /// A topic.
    Topic,
    /// A theory or hypothesis.
    Theory,
}

impl NodeType {
    /// Returns the lowercase tag used in prompts and JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Place => "place",
            Self::Event => "event",
            Self::Claim => "claim",
            Self::Topic => "topic",
            Self::Theory => "theory",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship kind of an edge.
///
/// Well-known kinds get their own variant; anything else is preserved
/// verbatim in [`EdgeType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeType {
    /// Source mentions target.
    Mentions,
    /// Source claims target.
    Claims,
    /// Source is located in target.
    LocatedIn,
    /// Source works for target.
    WorksFor,
    /// Generic relation.
    RelatedTo,
    /// Source supports target.
    Supports,
    /// Source opposes target.
    Opposes,
    /// Any other relationship kind.
    Other(String),
}

impl EdgeType {
    /// Returns the snake-case tag used in prompts and JSON.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mentions => "mentions",
            Self::Claims => "claims",
            Self::LocatedIn => "located_in",
            Self::WorksFor => "works_for",
            Self::RelatedTo => "related_to",
            Self::Supports => "supports",
            Self::Opposes => "opposes",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for EdgeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mentions" => Self::Mentions,
            "claims" => Self::Claims,
            "located_in" => Self::LocatedIn,
            "works_for" => Self::WorksFor,
            "related_to" => Self::RelatedTo,
            "supports" => Self::Supports,
            "opposes" => Self::Opposes,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for EdgeType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<EdgeType> for String {
    fn from(value: EdgeType) -> Self {
        match value {
            EdgeType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open-ended metadata bag shared by nodes and edges.
///
/// No field is required. Keys beyond the well-known ones are kept in
/// [`Metadata::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Date, as supplied by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Reference URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Author of a source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Role of a person.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Location of an entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Any other keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// Create metadata with only a description.
    #[must_use]
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: String,
    /// Human-readable display name.
    pub label: String,
    /// Entity category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Node {
    /// Create a node without metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            metadata: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach a description, creating metadata if needed.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::default)
            .description = Some(description.into());
        self
    }

    /// The description, or an empty string.
    #[must_use]
    pub fn description(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.description.as_deref())
            .unwrap_or("")
    }
}

/// A directed, typed relationship between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Optional edge identifier, used as the merge key across sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Relationship kind.
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Edge {
    /// Create an edge without id or metadata.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: impl Into<EdgeType>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
            metadata: None,
        }
    }

    /// Set the edge id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
