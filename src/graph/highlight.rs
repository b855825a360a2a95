//! Path highlighting
//!
//! The widget owns one [`HighlightState`]. While `None`, every element is
//! drawn with its palette color. While `Active`, every node and edge falls in
//! exactly one [`Tier`]:
//!
//! | Tier         | Membership                         | Emphasis           |
//! |--------------|------------------------------------|--------------------|
//! | ShortestPath | id in a shortest set               | accent, widest     |
//! | Highlighted  | id in a highlight set only         | accent, medium     |
//! | Dimmed       | neither                            | grey, translucent  |
//!
//! Shortest membership does not require highlight membership. Styling is
//! a pure function of (element, state, settings).

use std::collections::BTreeSet;

use egui::{Color32, Stroke};

use crate::config::HighlightSettings;

use super::colors::{
    category_border, category_fill, desaturate, relation_color, with_opacity, HIGHLIGHT_COLOR,
    SHORTEST_PATH_COLOR,
};
use super::types::{GraphEdge, GraphNode, GraphSnapshot};

// =============================================================================
// STATE
// =============================================================================

/// Ids currently emphasized, already restricted to the loaded graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSets {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<String>,
    pub shortest_nodes: BTreeSet<String>,
    pub shortest_edges: BTreeSet<String>,
}

impl HighlightSets {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.shortest_nodes.is_empty()
            && self.shortest_edges.is_empty()
    }

    /// Distinct highlighted nodes and edges, counting shortest members
    pub fn counts(&self) -> (usize, usize) {
        (
            self.nodes.union(&self.shortest_nodes).count(),
            self.edges.union(&self.shortest_edges).count(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HighlightState {
    #[default]
    None,
    Active(HighlightSets),
}

impl HighlightState {
    /// Build the state for a highlight request against `graph`.
    ///
    /// Unknown ids are dropped; if nothing survives the state is `None`.
    pub fn from_request<S: AsRef<str>>(
        graph: &GraphSnapshot,
        node_ids: &[S],
        edge_ids: &[S],
        shortest_node_ids: &[S],
        shortest_edge_ids: &[S],
    ) -> Self {
        let live_nodes = |ids: &[S]| -> BTreeSet<String> {
            ids.iter()
                .map(AsRef::<str>::as_ref)
                .filter(|id| graph.contains_node(id))
                .map(str::to_string)
                .collect()
        };
        let live_edges = |ids: &[S]| -> BTreeSet<String> {
            ids.iter()
                .map(AsRef::<str>::as_ref)
                .filter(|id| graph.contains_edge(id))
                .map(str::to_string)
                .collect()
        };

        let sets = HighlightSets {
            nodes: live_nodes(node_ids),
            edges: live_edges(edge_ids),
            shortest_nodes: live_nodes(shortest_node_ids),
            shortest_edges: live_edges(shortest_edge_ids),
        };

        let unknown = node_ids
            .iter()
            .chain(shortest_node_ids)
            .filter(|id| !graph.contains_node(id.as_ref()))
            .count()
            + edge_ids
                .iter()
                .chain(shortest_edge_ids)
                .filter(|id| !graph.contains_edge(id.as_ref()))
                .count();
        if unknown > 0 {
            tracing::debug!("highlight: ignoring {} ids not in the graph", unknown);
        }

        if sets.is_empty() {
            Self::None
        } else {
            Self::Active(sets)
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn sets(&self) -> Option<&HighlightSets> {
        match self {
            Self::None => None,
            Self::Active(sets) => Some(sets),
        }
    }

    pub fn node_tier(&self, id: &str) -> Tier {
        match self {
            Self::None => Tier::Normal,
            Self::Active(sets) => Tier::classify(&sets.shortest_nodes, &sets.nodes, id),
        }
    }

    pub fn edge_tier(&self, id: &str) -> Tier {
        match self {
            Self::None => Tier::Normal,
            Self::Active(sets) => Tier::classify(&sets.shortest_edges, &sets.edges, id),
        }
    }
}

/// Emphasis level of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// No highlight active
    Normal,
    ShortestPath,
    Highlighted,
    Dimmed,
}

impl Tier {
    fn classify(shortest: &BTreeSet<String>, highlighted: &BTreeSet<String>, id: &str) -> Self {
        if shortest.contains(id) {
            Self::ShortestPath
        } else if highlighted.contains(id) {
            Self::Highlighted
        } else {
            Self::Dimmed
        }
    }
}

// =============================================================================
// STYLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub tier: Tier,
    pub fill: Color32,
    pub stroke: Stroke,
    /// Multiplier on the category radius
    pub radius_scale: f32,
    pub opacity: f32,
    pub show_label: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub tier: Tier,
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
}

pub fn node_style(node: &GraphNode, state: &HighlightState, settings: &HighlightSettings) -> NodeStyle {
    let tier = state.node_tier(&node.id);
    let fill = category_fill(&node.category);

    match tier {
        Tier::Normal => NodeStyle {
            tier,
            fill,
            stroke: Stroke::new(1.5, category_border(&node.category)),
            radius_scale: 1.0,
            opacity: 1.0,
            show_label: true,
        },
        Tier::ShortestPath => NodeStyle {
            tier,
            fill,
            stroke: Stroke::new(3.0, SHORTEST_PATH_COLOR),
            radius_scale: 1.25,
            opacity: 1.0,
            show_label: true,
        },
        Tier::Highlighted => NodeStyle {
            tier,
            fill,
            stroke: Stroke::new(2.0, HIGHLIGHT_COLOR),
            radius_scale: 1.1,
            opacity: 1.0,
            show_label: true,
        },
        Tier::Dimmed => {
            let opacity = settings.dimmed_opacity;
            let grey = desaturate(fill, settings.dimmed_desaturation);
            NodeStyle {
                tier,
                fill: with_opacity(grey, opacity),
                stroke: Stroke::new(0.5, with_opacity(category_border(&node.category), opacity)),
                radius_scale: 1.0,
                opacity,
                show_label: false,
            }
        }
    }
}

pub fn edge_style(edge: &GraphEdge, state: &HighlightState, settings: &HighlightSettings) -> EdgeStyle {
    let tier = state.edge_tier(&edge.id);

    match tier {
        Tier::Normal => EdgeStyle {
            tier,
            color: relation_color(edge.label()),
            width: 1.2,
            opacity: 1.0,
        },
        Tier::ShortestPath => EdgeStyle {
            tier,
            color: SHORTEST_PATH_COLOR,
            width: settings.shortest_width,
            opacity: 1.0,
        },
        Tier::Highlighted => EdgeStyle {
            tier,
            color: HIGHLIGHT_COLOR,
            width: settings.highlighted_width,
            opacity: 1.0,
        },
        Tier::Dimmed => {
            let grey = desaturate(relation_color(edge.label()), settings.dimmed_desaturation);
            EdgeStyle {
                tier,
                color: with_opacity(grey, settings.dimmed_opacity),
                width: settings.dimmed_width,
                opacity: settings.dimmed_opacity,
            }
        }
    }
}

/// Styles for every node and edge, index-aligned with the snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleTable {
    pub nodes: Vec<NodeStyle>,
    pub edges: Vec<EdgeStyle>,
}

impl StyleTable {
    pub fn compute(graph: &GraphSnapshot, state: &HighlightState, settings: &HighlightSettings) -> Self {
        Self {
            nodes: graph.nodes.iter().map(|n| node_style(n, state, settings)).collect(),
            edges: graph.edges.iter().map(|e| edge_style(e, state, settings)).collect(),
        }
    }

    pub fn node(&self, index: usize) -> Option<&NodeStyle> {
        self.nodes.get(index)
    }

    pub fn edge(&self, index: usize) -> Option<&EdgeStyle> {
        self.edges.get(index)
    }

    /// Number of nodes in `tier`
    pub fn node_count(&self, tier: Tier) -> usize {
        self.nodes.iter().filter(|s| s.tier == tier).count()
    }

    pub fn edge_count(&self, tier: Tier) -> usize {
        self.edges.iter().filter(|s| s.tier == tier).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize::normalize;
    use crate::graph::types::GraphPayload;
    use pretty_assertions::assert_eq;

    fn graph() -> GraphSnapshot {
        let payload = GraphPayload::from_json_str(
            r#"{
                "nodes": [{"id":"1","labels":["Person"]},{"id":"2"},{"id":"3"}],
                "edges": [
                    {"id":"e1","source":"1","target":"2","type":"WORKS_FOR"},
                    {"id":"e2","source":"2","target":"3","type":"LOCATED_IN"}
                ]
            }"#,
        )
        .unwrap();
        normalize(&payload).0
    }

    const NONE: &[&str] = &[];

    #[test]
    fn unknown_ids_are_dropped() {
        let g = graph();
        let state = HighlightState::from_request(&g, &["1", "404"], &["e9"], NONE, NONE);
        let sets = state.sets().unwrap();
        assert_eq!(sets.nodes.iter().collect::<Vec<_>>(), vec!["1"]);
        assert!(sets.edges.is_empty());
    }

    #[test]
    fn request_with_only_unknown_ids_is_none() {
        let g = graph();
        let state = HighlightState::from_request(&g, &["404"], &["e404"], &["x"], NONE);
        assert_eq!(state, HighlightState::None);
    }

    #[test]
    fn shortest_membership_does_not_need_highlight_membership() {
        let g = graph();
        let state = HighlightState::from_request(&g, NONE, NONE, &["2"], &["e2"]);
        assert_eq!(state.node_tier("2"), Tier::ShortestPath);
        assert_eq!(state.edge_tier("e2"), Tier::ShortestPath);
        assert_eq!(state.node_tier("1"), Tier::Dimmed);
    }

    #[test]
    fn every_element_has_exactly_one_tier() {
        let g = graph();
        let state = HighlightState::from_request(&g, &["1", "2"], &["e1"], &["1"], NONE);
        let table = StyleTable::compute(&g, &state, &HighlightSettings::default());

        assert_eq!(table.node_count(Tier::ShortestPath), 1);
        assert_eq!(table.node_count(Tier::Highlighted), 1);
        assert_eq!(table.node_count(Tier::Dimmed), 1);
        assert_eq!(table.node_count(Tier::Normal), 0);
        assert_eq!(table.edge_count(Tier::Highlighted), 1);
        assert_eq!(table.edge_count(Tier::Dimmed), 1);
    }

    #[test]
    fn inactive_state_uses_palette() {
        let g = graph();
        let table = StyleTable::compute(&g, &HighlightState::None, &HighlightSettings::default());
        assert!(table.nodes.iter().all(|s| s.tier == Tier::Normal && s.opacity == 1.0));
        assert_eq!(table.edges[0].color, relation_color("WORKS_FOR"));
    }

    #[test]
    fn dimmed_edges_are_thinner_than_highlighted() {
        let g = graph();
        let settings = HighlightSettings::default();
        let state = HighlightState::from_request(&g, NONE, &["e1"], NONE, NONE);
        let highlighted = edge_style(&g.edges[0], &state, &settings);
        let dimmed = edge_style(&g.edges[1], &state, &settings);
        assert!(dimmed.width < highlighted.width);
        assert_eq!(dimmed.opacity, settings.dimmed_opacity);
    }

    #[test]
    fn style_computation_is_repeatable() {
        let g = graph();
        let settings = HighlightSettings::default();
        let state = HighlightState::from_request(&g, &["1"], &["e1"], &["1"], &["e1"]);
        assert_eq!(
            StyleTable::compute(&g, &state, &settings),
            StyleTable::compute(&g, &state, &settings)
        );
    }
}
