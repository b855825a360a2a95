//! Payload normalization
//!
//! Turns a [`GraphPayload`] into a [`GraphSnapshot`]:
//!
//! - ids are coerced to strings (`1` and `"1"` name the same node)
//! - the first node with a given id wins; later duplicates are dropped
//! - edges whose source or target does not resolve are dropped
//! - null or non-object property bags become empty maps
//!
//! Nothing here is fatal. Every dropped record is logged with `warn!` and
//! counted in the returned [`NormalizeReport`].

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::classify::classify;
use super::types::{GraphEdge, GraphNode, GraphPayload, GraphSnapshot, RawEdge, RawNode};

/// Fallback relation type for edges without one
pub const DEFAULT_RELATION: &str = "RELATED_TO";

const NAME_KEYS: &[&str] = &["name", "title", "label", "display_name"];
const EDGE_NAME_KEYS: &[&str] = &["display_name", "name", "label"];
const VERSION_KEYS: &[&str] = &["version", "valid_at"];
const SOURCE_KEYS: &[&str] = &["source_id", "source_node_id", "episode_id"];

/// What normalization dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub nodes_in: usize,
    pub edges_in: usize,
    pub nodes_without_id: usize,
    pub duplicate_nodes: usize,
    pub duplicate_edges: usize,
    /// Edges dropped because an endpoint is not in the node set
    pub dangling_edges: usize,
}

impl NormalizeReport {
    pub fn dropped_nodes(&self) -> usize {
        self.nodes_without_id + self.duplicate_nodes
    }

    pub fn dropped_edges(&self) -> usize {
        self.duplicate_edges + self.dangling_edges
    }

    pub fn is_clean(&self) -> bool {
        self.dropped_nodes() == 0 && self.dropped_edges() == 0
    }
}

/// Normalize a payload into a fresh snapshot
pub fn normalize(payload: &GraphPayload) -> (GraphSnapshot, NormalizeReport) {
    let mut report = NormalizeReport {
        nodes_in: payload.nodes.len(),
        edges_in: payload.edges.len(),
        ..Default::default()
    };

    // Node index first so edges resolve against the final node set
    let mut seen_nodes: HashSet<String> = HashSet::with_capacity(payload.nodes.len());
    let mut nodes = Vec::with_capacity(payload.nodes.len());
    for (i, raw) in payload.nodes.iter().enumerate() {
        let Some(id) = coerce_id(&raw.id) else {
            warn!("Dropping node #{}: missing or non-scalar id {}", i, raw.id);
            report.nodes_without_id += 1;
            continue;
        };
        if !seen_nodes.insert(id.clone()) {
            warn!("Dropping duplicate node id {:?}", id);
            report.duplicate_nodes += 1;
            continue;
        }
        nodes.push(normalize_node(id, raw));
    }

    let mut seen_edges: HashSet<String> = HashSet::with_capacity(payload.edges.len());
    let mut edges = Vec::with_capacity(payload.edges.len());
    for (i, raw) in payload.edges.iter().enumerate() {
        let source = coerce_id(&raw.source);
        let target = coerce_id(&raw.target);
        let (Some(source), Some(target)) = (source, target) else {
            warn!("Dropping edge #{}: missing endpoint id", i);
            report.dangling_edges += 1;
            continue;
        };
        if !seen_nodes.contains(&source) || !seen_nodes.contains(&target) {
            warn!(
                "Dropping edge #{} ({} -> {}): endpoint not in node set",
                i, source, target
            );
            report.dangling_edges += 1;
            continue;
        }

        let id = coerce_id(&raw.id).unwrap_or_else(|| format!("{}->{}#{}", source, target, i));
        if !seen_edges.insert(id.clone()) {
            warn!("Dropping duplicate edge id {:?}", id);
            report.duplicate_edges += 1;
            continue;
        }
        edges.push(normalize_edge(id, source, target, raw));
    }

    debug!(
        "Normalized graph: {} nodes, {} edges ({} nodes / {} edges dropped)",
        nodes.len(),
        edges.len(),
        report.dropped_nodes(),
        report.dropped_edges()
    );

    (GraphSnapshot::from_parts(nodes, edges), report)
}

fn normalize_node(id: String, raw: &RawNode) -> GraphNode {
    let properties = property_map(&raw.properties);
    let name = first_string(&properties, NAME_KEYS)
        .or_else(|| raw.display_label())
        .unwrap_or_else(|| id.clone());

    if raw.malformed_type_hint() {
        warn!("Ignoring non-string type hint on node {:?}", id);
    }

    // An explicit type hint outranks every label
    let labels = raw.label_list();
    let mut hinted: Vec<String> = Vec::with_capacity(labels.len() + 1);
    hinted.extend(raw.type_hint());
    hinted.extend(labels.iter().cloned());
    let category = classify(&hinted, &name);

    GraphNode {
        version: first_string(&properties, VERSION_KEYS),
        source_id: first_string(&properties, SOURCE_KEYS),
        id,
        name,
        category,
        labels,
        properties,
        position: egui::Pos2::ZERO,
        velocity: egui::Vec2::ZERO,
        pinned: false,
    }
}

fn normalize_edge(id: String, source: String, target: String, raw: &RawEdge) -> GraphEdge {
    let properties = property_map(&raw.properties);
    if raw.malformed_relation() {
        warn!("Ignoring non-string relation type on edge {:?}", id);
    }
    let relation = raw
        .relation_name()
        .unwrap_or_else(|| DEFAULT_RELATION.to_string());

    GraphEdge {
        display_name: first_string(&properties, EDGE_NAME_KEYS).or_else(|| raw.display_label()),
        version: first_string(&properties, VERSION_KEYS),
        source_id: first_string(&properties, SOURCE_KEYS),
        id,
        source,
        target,
        relation,
        properties,
    }
}

/// Single string form for ids. Strings are kept verbatim (after trimming),
/// numbers and booleans use their JSON rendering. Anything else has no id.
pub fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn property_map(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            warn!("Replacing non-object property bag ({}) with empty map", type_name(other));
            Map::new()
        }
    }
}

fn first_string(properties: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match properties.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::Category;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(v: Value) -> GraphPayload {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn numeric_and_string_ids_resolve_to_the_same_node() {
        let p = payload(json!({
            "nodes": [{"id": 1, "labels": ["Person"], "properties": {"name": "A"}},
                      {"id": "2", "labels": ["Person"], "properties": {"name": "B"}}],
            "edges": [{"id": 10, "source": "1", "target": 2, "type": "KNOWS"}]
        }));
        let (graph, report) = normalize(&p);
        assert!(report.is_clean());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].id, "10");
        assert_eq!(graph.edges[0].source, "1");
        assert_eq!(graph.edges[0].target, "2");
    }

    #[test]
    fn duplicate_nodes_keep_first() {
        let p = payload(json!({
            "nodes": [{"id": "a", "properties": {"name": "first"}},
                      {"id": "a", "properties": {"name": "second"}}]
        }));
        let (graph, report) = normalize(&p);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].name, "first");
        assert_eq!(report.duplicate_nodes, 1);
    }

    #[test]
    fn nodes_without_id_are_dropped() {
        let p = payload(json!({"nodes": [{"labels": ["Person"]}, {"id": {"nested": 1}}]}));
        let (graph, report) = normalize(&p);
        assert!(graph.is_empty());
        assert_eq!(report.nodes_without_id, 2);
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let p = payload(json!({
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [{"id": "e1", "source": "a", "target": "b"},
                      {"id": "e2", "source": "a", "target": "missing"},
                      {"id": "e3", "target": "b"}]
        }));
        let (graph, report) = normalize(&p);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(report.dangling_edges, 2);
        for edge in &graph.edges {
            assert!(graph.contains_node(&edge.source));
            assert!(graph.contains_node(&edge.target));
        }
    }

    #[test]
    fn missing_edge_ids_are_synthesized() {
        let p = payload(json!({
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [{"source": "a", "target": "b"}, {"source": "a", "target": "b"}]
        }));
        let (graph, _) = normalize(&p);
        assert_eq!(graph.edges[0].id, "a->b#0");
        assert_eq!(graph.edges[1].id, "a->b#1");
        assert_eq!(graph.edges[0].relation, DEFAULT_RELATION);
    }

    #[test]
    fn malformed_property_bags_become_empty() {
        let p = payload(json!({
            "nodes": [{"id": "a", "properties": null}, {"id": "b", "properties": [1, 2]}],
            "edges": [{"id": "e", "source": "a", "target": "b", "properties": "oops"}]
        }));
        let (graph, _) = normalize(&p);
        assert!(graph.nodes.iter().all(|n| n.properties.is_empty()));
        assert!(graph.edges[0].properties.is_empty());
        // name falls back to id
        assert_eq!(graph.nodes[0].name, "a");
    }

    #[test]
    fn provenance_and_version_are_lifted_from_properties() {
        let p = payload(json!({
            "nodes": [{"id": "a", "properties": {"name": "A", "version": "v3", "source_id": "ep-1"}},
                      {"id": "b"}],
            "edges": [{"id": "e", "source": "a", "target": "b", "type": "MENTIONS",
                       "properties": {"display_name": "提到", "episode_id": "ep-1"}}]
        }));
        let (graph, _) = normalize(&p);
        let a = graph.get_node("a").unwrap();
        assert_eq!(a.version.as_deref(), Some("v3"));
        assert_eq!(a.source_id.as_deref(), Some("ep-1"));
        let e = graph.get_edge("e").unwrap();
        assert_eq!(e.label(), "提到");
        assert_eq!(e.source_id.as_deref(), Some("ep-1"));
    }

    #[test]
    fn type_hint_outranks_labels() {
        let p = payload(json!({
            "nodes": [{"id": "a", "type": "Event", "labels": ["Person"], "properties": {"name": "x"}}]
        }));
        let (graph, _) = normalize(&p);
        assert_eq!(graph.nodes[0].category, Category::Event);
        assert_eq!(graph.nodes[0].labels, vec!["Person".to_string()]);
    }

    #[test]
    fn alternate_keys_resolve_by_precedence() {
        let p = payload(json!({
            "nodes": [{"id": "1", "labels": ["Person"], "label": "张三"},
                      {"id": "2", "label": "Organization", "properties": {"name": "阿里巴巴公司"}},
                      {"id": "3", "type": 7, "labels": ["Location"], "properties": {"name": "杭州市"}}],
            "edges": [{"id": "e1", "source": "1", "target": "2",
                       "type": "WORKS_FOR", "label": "works for"},
                      {"id": "e2", "source": "2", "target": "3", "type": 7, "relation": "LOCATED_IN"},
                      {"id": "e3", "source": "1", "target": "3", "type": {"x": 1}}]
        }));
        let (graph, report) = normalize(&p);
        assert!(report.is_clean());

        let n1 = graph.get_node("1").unwrap();
        assert_eq!(n1.name, "张三");
        assert_eq!(n1.category, Category::Person);
        assert_eq!(graph.get_node("2").unwrap().category, Category::Organization);
        assert_eq!(graph.get_node("3").unwrap().category, Category::Location);

        let e1 = graph.get_edge("e1").unwrap();
        assert_eq!(e1.relation, "WORKS_FOR");
        assert_eq!(e1.label(), "works for");
        assert_eq!(graph.get_edge("e2").unwrap().relation, "LOCATED_IN");
        assert_eq!(graph.get_edge("e3").unwrap().relation, DEFAULT_RELATION);
    }

    #[test]
    fn non_object_records_are_counted_as_missing_ids() {
        let p = GraphPayload::from_json_str(r#"{"nodes":["x",{"id":"a"}],"edges":[7]}"#).unwrap();
        let (graph, report) = normalize(&p);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(report.nodes_without_id, 1);
        assert_eq!(report.dangling_edges, 1);
    }

    #[test]
    fn normalization_is_idempotent() {
        let p = payload(json!({
            "nodes": [{"id": "1", "labels": ["Entity"], "properties": {"name": "张三"}},
                      {"id": "2", "labels": ["Entity"], "properties": {"name": "阿里巴巴公司"}}],
            "edges": [{"id": "e1", "source": "1", "target": "2", "type": "WORKS_FOR"}]
        }));
        let (first, first_report) = normalize(&p);
        let (second, second_report) = normalize(&p);
        assert_eq!(first, second);
        assert_eq!(first_report, second_report);
    }
}
