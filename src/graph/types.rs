//! Core types for the knowledge graph visualization
//!
//! `GraphPayload` is the wire shape returned by the graph query service.
//! `GraphSnapshot` is the canonical, de-duplicated model built from it by
//! [`normalize`](super::normalize::normalize); the layout and renderer only
//! ever see a snapshot.

use egui::{Pos2, Vec2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// =============================================================================
// WIRE PAYLOAD (from server)
// =============================================================================

/// Graph payload as received from the graph query service.
///
/// Every record field is kept as a raw JSON value so that alternate key
/// spellings, mistyped values and non-object records never fail the whole
/// decode. Precedence between alternate keys is resolved by the accessors
/// below; [`normalize`](super::normalize::normalize) drops what is unusable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphPayload {
    #[serde(default, deserialize_with = "record_list")]
    pub nodes: Vec<RawNode>,
    #[serde(default, deserialize_with = "record_list")]
    pub edges: Vec<RawEdge>,
}

impl GraphPayload {
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNode {
    /// String or number; coerced to a string during normalization
    #[serde(default)]
    pub id: Value,
    /// Source tags: a list, or a bare string
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub labels: Value,
    /// Single tag when `labels` is absent; otherwise a display name
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub label: Value,
    /// Explicit type hint, treated as the most specific label
    #[serde(default, rename = "type", skip_serializing_if = "Value::is_null")]
    pub type_hint: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub entity_type: Value,
    /// Arbitrary property bag; null or non-object values become empty
    #[serde(default)]
    pub properties: Value,
}

impl RawNode {
    /// Tags in payload order. `labels` wins over `label`; non-string
    /// entries are skipped.
    pub fn label_list(&self) -> Vec<String> {
        if self.labels.is_null() {
            string_list(&self.label)
        } else {
            string_list(&self.labels)
        }
    }

    /// `label` when it is a display name rather than the tag list
    pub fn display_label(&self) -> Option<String> {
        if self.labels.is_null() {
            None
        } else {
            non_empty_str(&self.label)
        }
    }

    /// First usable type hint (`type`, then `entity_type`)
    pub fn type_hint(&self) -> Option<String> {
        non_empty_str(&self.type_hint).or_else(|| non_empty_str(&self.entity_type))
    }

    /// Type hint values present but not strings
    pub fn malformed_type_hint(&self) -> bool {
        [&self.type_hint, &self.entity_type]
            .iter()
            .any(|v| !v.is_null() && !v.is_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEdge {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub target: Value,
    #[serde(default, rename = "type", skip_serializing_if = "Value::is_null")]
    pub relation_type: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub relation: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub label: Value,
    #[serde(default)]
    pub properties: Value,
}

impl RawEdge {
    /// Relation type: `type`, then `relation`, then `label`
    pub fn relation_name(&self) -> Option<String> {
        non_empty_str(&self.relation_type)
            .or_else(|| non_empty_str(&self.relation))
            .or_else(|| non_empty_str(&self.label))
    }

    /// `label` when a more specific key already named the relation
    pub fn display_label(&self) -> Option<String> {
        let label = non_empty_str(&self.label)?;
        let relation =
            non_empty_str(&self.relation_type).or_else(|| non_empty_str(&self.relation))?;
        (label != relation).then_some(label)
    }

    /// Relation values present but not strings
    pub fn malformed_relation(&self) -> bool {
        [&self.relation_type, &self.relation, &self.label]
            .iter()
            .any(|v| !v.is_null() && !v.is_string())
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Record list that tolerates null and non-object entries. An entry that is
/// not an object becomes an empty record, which normalization then drops for
/// lack of an id.
fn record_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Record #{} is not an object ({}); treating it as empty", i, e);
                T::default()
            })
        })
        .collect())
}

// =============================================================================
// CATEGORY
// =============================================================================

/// Semantic category of an entity.
///
/// Open enum: labels that are not one of the known categories are carried as
/// `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Person,
    Organization,
    Location,
    Concept,
    Event,
    Product,
    Technology,
    Document,
    Episodic,
    Requirement,
    Feature,
    Module,
    #[default]
    Entity,
    Other(String),
}

impl Category {
    /// Parse a known category name (case-insensitive, a few common synonyms).
    /// Returns `None` for anything else.
    pub fn parse_known(s: &str) -> Option<Self> {
        Some(match s.trim().to_lowercase().as_str() {
            "person" | "people" | "human" => Self::Person,
            "organization" | "organisation" | "org" | "company" => Self::Organization,
            "location" | "place" | "geo" => Self::Location,
            "concept" => Self::Concept,
            "event" => Self::Event,
            "product" => Self::Product,
            "technology" | "tech" => Self::Technology,
            "document" => Self::Document,
            "episodic" | "episode" => Self::Episodic,
            "requirement" => Self::Requirement,
            "feature" => Self::Feature,
            "module" => Self::Module,
            "entity" => Self::Entity,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Location => "Location",
            Self::Concept => "Concept",
            Self::Event => "Event",
            Self::Product => "Product",
            Self::Technology => "Technology",
            Self::Document => "Document",
            Self::Episodic => "Episodic",
            Self::Requirement => "Requirement",
            Self::Feature => "Feature",
            Self::Module => "Module",
            Self::Entity => "Entity",
            Self::Other(name) => name,
        }
    }

    /// Rendered node radius in world units. Structurally significant
    /// categories (containers of other entities) draw larger.
    pub fn radius(&self) -> f32 {
        match self {
            Self::Episodic | Self::Document => 22.0,
            Self::Organization => 20.0,
            Self::Location | Self::Event | Self::Module => 17.0,
            Self::Person | Self::Product | Self::Technology => 16.0,
            Self::Requirement | Self::Feature => 15.0,
            Self::Concept | Self::Entity | Self::Other(_) => 14.0,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::parse_known(&s).unwrap_or(Self::Other(s))
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CANONICAL GRAPH (computed for layout and rendering)
// =============================================================================

/// A normalized entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Source tags in payload order
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
    pub version: Option<String>,
    /// Id of the source-content unit this entity was extracted from
    pub source_id: Option<String>,

    /// World position, owned by the layout
    #[serde(skip)]
    pub position: Pos2,
    #[serde(skip)]
    pub velocity: Vec2,
    /// True while the node is held by a drag
    #[serde(skip)]
    pub pinned: bool,
}

impl GraphNode {
    pub fn radius(&self) -> f32 {
        self.category.radius()
    }
}

/// A normalized, directed relationship
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation: String,
    pub display_name: Option<String>,
    pub properties: Map<String, Value>,
    pub version: Option<String>,
    pub source_id: Option<String>,
}

impl GraphEdge {
    /// Display name, falling back to the relation type
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.relation)
    }
}

/// One loaded graph. Rebuilt wholesale on every load; never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
}

impl GraphSnapshot {
    /// Build a snapshot from already-validated nodes and edges.
    ///
    /// Callers guarantee unique ids and resolvable endpoints; use
    /// `normalize` for untrusted input.
    pub(crate) fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let edge_index = edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self {
            nodes,
            edges,
            node_index,
            edge_index,
        }
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn edge_index(&self, id: &str) -> Option<usize> {
        self.edge_index.get(id).copied()
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.node_index(id).map(|i| &mut self.nodes[i])
    }

    pub fn get_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edge_index(id).map(|i| &self.edges[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    /// (source index, target index) for each edge, in edge order
    pub fn edge_endpoints(&self) -> Vec<(usize, usize)> {
        self.edges
            .iter()
            .filter_map(|e| Some((self.node_index(&e.source)?, self.node_index(&e.target)?)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// =============================================================================
// EVENTS (raised to the host)
// =============================================================================

/// Events raised outward; drained by the host each frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEvent {
    NodeSelected { node: GraphNode },
    EdgeSelected { edge: GraphEdge },
    /// An active highlight was cleared from inside the widget
    HighlightCleared,
    /// Host should open its preview for the source-content unit
    SourcePreviewRequested { node_id: String, source_id: String },
}
