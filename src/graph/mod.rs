//! Knowledge graph visualization
//!
//! # Architecture
//!
//! ```text
//! GraphPayload (from server)
//!        │
//!        ▼
//! normalize ──► classify (category inference)
//!        │
//!        ▼
//! GraphSnapshot (validated nodes/edges)
//!        │
//!        ▼
//! ForceSimulation (one step per frame)
//!        │
//!        ├──► StyleTable (HighlightState + palette, recomputed every step)
//!        │
//!        ├──► GraphRenderer (draws to egui::Painter)
//!        │         └──► edges (routing, arrows, labels)
//!        │
//!        └──► InputHandler (drag, pan, zoom, clicks)
//!                    │
//!                    ▼
//!              Camera2D + SpatialIndex
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut widget = KnowledgeGraphWidget::new();
//! widget.set_payload(api.fetch_graph().await?);
//!
//! // Each frame:
//! widget.ui(ui);
//! for event in widget.take_events() {
//!     host.handle(event);
//! }
//! ```

pub mod animation;
pub mod camera;
pub mod classify;
pub mod colors;
pub mod edges;
pub mod force_sim;
pub mod highlight;
pub mod input;
pub mod normalize;
pub mod render;
pub mod spatial;
pub mod types;

pub use camera::Camera2D;
pub use classify::{classify, TypeClassifier};
pub use force_sim::ForceSimulation;
pub use highlight::{EdgeStyle, HighlightState, NodeStyle, StyleTable, Tier};
pub use input::{InputHandler, InputState, PointerTarget};
pub use normalize::{normalize, NormalizeReport};
pub use render::GraphRenderer;
pub use types::*;

use egui::{Align2, FontId, Pos2, Rect, Sense, Vec2};
use tracing::{debug, info};

use crate::config::{global_config, GraphSettings};

use colors::{canvas_background, secondary_text_color};
use edges::{curve_strengths, route_edges, EdgeCurve};
use input::{resolve_click, resolve_double_click, InputOutcome};
use render::{ChromeInfo, RenderContext};
use spatial::SpatialIndex;

/// Layout center used until the widget has been drawn once
const DEFAULT_VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

/// Alpha below which the first automatic fit happens
const FIT_ALPHA: f32 = 0.1;

// =============================================================================
// KNOWLEDGE GRAPH WIDGET
// =============================================================================

/// Force-directed knowledge graph with path highlighting.
///
/// Owns one loaded graph at a time. Reloading discards the simulation,
/// highlight and hover state wholesale.
pub struct KnowledgeGraphWidget {
    settings: GraphSettings,
    /// Last payload, kept for refresh
    payload: Option<GraphPayload>,
    report: Option<NormalizeReport>,
    sim: Option<ForceSimulation>,
    highlight: HighlightState,
    styles: StyleTable,
    curve_strengths: Vec<f32>,
    /// World-space edge routes, index-aligned with the snapshot's edges
    routes: Vec<Option<EdgeCurve>>,
    spatial: SpatialIndex,
    camera: Camera2D,
    input: InputState,
    renderer: GraphRenderer,
    events: Vec<GraphEvent>,
    /// Size of the last allocated canvas
    viewport: Option<Vec2>,
    /// Fit once the fresh layout has spread out
    fit_when_settled: bool,
    /// Fit on the next frame
    fit_requested: bool,
}

impl Default for KnowledgeGraphWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraphWidget {
    pub fn new() -> Self {
        Self::with_settings(global_config().clone())
    }

    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            camera: Camera2D::new(&settings.camera, &settings.animation),
            settings,
            payload: None,
            report: None,
            sim: None,
            highlight: HighlightState::None,
            styles: StyleTable::default(),
            curve_strengths: Vec::new(),
            routes: Vec::new(),
            spatial: SpatialIndex::new(),
            input: InputState::new(),
            renderer: GraphRenderer::new(),
            events: Vec::new(),
            viewport: None,
            fit_when_settled: false,
            fit_requested: false,
        }
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Load a graph, replacing whatever was shown.
    ///
    /// Invalid records are dropped and counted in the returned report; this
    /// never fails.
    pub fn set_payload(&mut self, payload: GraphPayload) -> NormalizeReport {
        self.payload = Some(payload);
        self.load().unwrap_or_default()
    }

    /// Rebuild from the last payload: fresh layout at full heat, highlight
    /// cleared. `None` when nothing has been loaded.
    pub fn refresh(&mut self) -> Option<NormalizeReport> {
        debug!("Refreshing graph");
        self.load()
    }

    /// Drop the loaded graph
    pub fn clear(&mut self) {
        self.payload = None;
        self.report = None;
        self.sim = None;
        self.highlight = HighlightState::None;
        self.styles = StyleTable::default();
        self.curve_strengths.clear();
        self.routes.clear();
        self.spatial.clear();
        self.input.reset();
        self.fit_when_settled = false;
        self.fit_requested = false;
    }

    fn load(&mut self) -> Option<NormalizeReport> {
        let payload = self.payload.as_ref()?;
        let (snapshot, report) = normalize(payload);

        info!(
            "Loaded graph: {} nodes, {} edges ({} nodes / {} edges skipped)",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            report.dropped_nodes(),
            report.dropped_edges()
        );

        let center = (self.viewport.unwrap_or(DEFAULT_VIEWPORT) / 2.0).to_pos2();
        let sim = ForceSimulation::new_centered(snapshot, self.settings.forces.clone(), center);

        self.curve_strengths = curve_strengths(sim.graph());
        self.sim = Some(sim);
        self.highlight = HighlightState::None;
        self.input.reset();
        self.report = Some(report.clone());
        self.rebuild_derived();

        self.camera.reset(center);
        self.camera.snap_to_target();
        self.fit_when_settled = true;

        Some(report)
    }

    /// Recompute styles, routes and the spatial index from current
    /// positions and highlight state
    fn rebuild_derived(&mut self) {
        let Some(sim) = self.sim.as_ref() else {
            return;
        };
        let graph = sim.graph();

        self.styles = StyleTable::compute(graph, &self.highlight, &self.settings.highlight);
        let styles = &self.styles;
        let drawn_radius =
            |i: usize| graph.nodes[i].radius() * styles.node(i).map_or(1.0, |s| s.radius_scale);
        self.routes = route_edges(graph, &self.curve_strengths, drawn_radius);
        self.spatial.rebuild(graph, drawn_radius);
    }

    // =========================================================================
    // HIGHLIGHT
    // =========================================================================

    /// Emphasize paths. Ids not in the loaded graph are ignored; if none
    /// remain the highlight is cleared. Styles update immediately.
    pub fn highlight_paths<S: AsRef<str>>(
        &mut self,
        node_ids: &[S],
        edge_ids: &[S],
        shortest_node_ids: &[S],
        shortest_edge_ids: &[S],
    ) {
        let Some(sim) = self.sim.as_ref() else {
            debug!("highlight_paths ignored: no graph loaded");
            return;
        };
        self.highlight = HighlightState::from_request(
            sim.graph(),
            node_ids,
            edge_ids,
            shortest_node_ids,
            shortest_edge_ids,
        );
        if let Some(sets) = self.highlight.sets() {
            let (n, e) = sets.counts();
            debug!("Highlighting {} nodes, {} edges", n, e);
        }
        self.rebuild_derived();
    }

    pub fn clear_highlight(&mut self) {
        if self.highlight.is_active() {
            debug!("Clearing highlight");
        }
        self.highlight = HighlightState::None;
        self.rebuild_derived();
    }

    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    /// Current per-element styles, index-aligned with the snapshot
    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    // =========================================================================
    // CAMERA
    // =========================================================================

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    /// Back to 100% around the layout center
    pub fn reset_zoom(&mut self) {
        let center = self.sim.as_ref().map_or(Pos2::ZERO, |s| s.center);
        self.camera.reset(center);
    }

    /// Frame the whole graph on the next draw
    pub fn fit_to_content(&mut self) {
        self.fit_requested = true;
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    /// Events raised since the last call, oldest first
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Option<&GraphSnapshot> {
        self.sim.as_ref().map(ForceSimulation::graph)
    }

    pub fn simulation(&self) -> Option<&ForceSimulation> {
        self.sim.as_ref()
    }

    /// Report from the last load
    pub fn report(&self) -> Option<&NormalizeReport> {
        self.report.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.sim.is_some()
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance the layout one step and restyle. Returns true if anything
    /// moved.
    pub fn step(&mut self) -> bool {
        let moved = self.sim.as_mut().is_some_and(ForceSimulation::tick);
        self.rebuild_derived();
        moved
    }

    /// Draw the graph and process input for this frame
    pub fn ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let screen_rect = response.rect;

        painter.rect_filled(screen_rect, 0.0, canvas_background());
        self.handle_resize(screen_rect.size());

        let Some(sim) = self.sim.as_mut() else {
            painter.text(
                screen_rect.center(),
                Align2::CENTER_CENTER,
                "No graph loaded",
                FontId::proportional(16.0),
                secondary_text_color(),
            );
            return response;
        };

        let dt = ui.input(|i| i.stable_dt);
        self.camera.update(dt);

        let outcome = InputHandler::handle_input(
            &response,
            &mut self.camera,
            &mut self.input,
            sim,
            &self.spatial,
            &self.routes,
            screen_rect,
            self.settings.camera.scroll_sensitivity,
        );
        let mut needs_repaint = outcome.needs_repaint;
        self.apply_outcome(outcome);

        needs_repaint |= self.step();
        self.fit_if_due(screen_rect);

        if let Some(sim) = self.sim.as_ref() {
            let ctx = RenderContext {
                graph: sim.graph(),
                styles: &self.styles,
                routes: &self.routes,
                spatial: &self.spatial,
                camera: &self.camera,
                settings: &self.settings.highlight,
                hovered_node: self.input.hovered_node,
                hovered_edge: self.input.hovered_edge,
            };
            self.renderer.render(&painter, &ctx, screen_rect);
            self.renderer
                .render_chrome(&painter, &self.chrome_info(), screen_rect);
        }

        if needs_repaint || self.camera.is_animating() || self.fit_requested {
            ui.ctx().request_repaint();
        }

        response
    }

    fn handle_resize(&mut self, size: Vec2) {
        if size.x < 1.0 || size.y < 1.0 {
            return;
        }
        let changed = self
            .viewport
            .map_or(true, |old| (old - size).length_sq() > 0.25);
        if !changed {
            return;
        }

        let first = self.viewport.is_none();
        self.viewport = Some(size);

        if let Some(sim) = self.sim.as_mut() {
            sim.set_viewport_size(size.x, size.y);
            debug!("Viewport {}x{}, layout reheated", size.x, size.y);
            self.camera.fly_to(sim.center);
            if first {
                self.camera.snap_to_target();
            }
        }
    }

    fn fit_if_due(&mut self, screen_rect: Rect) {
        let Some(sim) = self.sim.as_ref() else {
            return;
        };
        let settled = sim.is_stable() || sim.alpha() < FIT_ALPHA;
        if !(self.fit_requested || (self.fit_when_settled && settled)) {
            return;
        }
        if let Some(bounds) = sim.bounds() {
            self.camera.fit_to_bounds(bounds, screen_rect);
        }
        self.fit_requested = false;
        self.fit_when_settled = false;
    }

    /// Turn one frame of input into highlight changes and events
    fn apply_outcome(&mut self, outcome: InputOutcome) {
        let Some(sim) = self.sim.as_ref() else {
            return;
        };
        let graph = sim.graph();
        let mut events = Vec::new();
        let mut clear = outcome.clear_highlight && self.highlight.is_active();

        if let Some(target) = outcome.click {
            let resolution = resolve_click(target, graph, self.highlight.is_active());
            clear |= resolution.clear_highlight;
            // Raised once below, even when Esc landed in the same frame
            events.extend(
                resolution
                    .event
                    .filter(|e| !matches!(e, GraphEvent::HighlightCleared)),
            );
        }

        if let Some(target) = outcome.double_click {
            match resolve_double_click(target, graph) {
                Some(event) => events.push(event),
                None if target == PointerTarget::Background => self.fit_requested = true,
                None => {}
            }
        }

        if clear {
            events.push(GraphEvent::HighlightCleared);
        }
        if outcome.fit {
            self.fit_requested = true;
        }
        if outcome.reset_zoom {
            self.reset_zoom();
        }

        for event in &events {
            debug!("Graph event: {:?}", event_kind(event));
        }
        self.events.extend(events);

        if clear {
            self.clear_highlight();
        }
    }

    fn chrome_info(&self) -> ChromeInfo {
        let (nodes, edges) = self
            .snapshot()
            .map_or((0, 0), |g| (g.nodes.len(), g.edges.len()));
        ChromeInfo {
            nodes,
            edges,
            zoom: self.camera.zoom(),
            highlight: self.highlight.sets().map(|s| s.counts()),
            dropped: self
                .report
                .as_ref()
                .map_or(0, |r| r.dropped_nodes() + r.dropped_edges()),
            settling: self.sim.as_ref().is_some_and(|s| !s.is_stable()),
        }
    }
}

fn event_kind(event: &GraphEvent) -> String {
    match event {
        GraphEvent::NodeSelected { node } => format!("node_selected {}", node.id),
        GraphEvent::EdgeSelected { edge } => format!("edge_selected {}", edge.id),
        GraphEvent::HighlightCleared => "highlight_cleared".to_string(),
        GraphEvent::SourcePreviewRequested { source_id, .. } => {
            format!("source_preview {}", source_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NONE: &[&str] = &[];

    fn widget() -> KnowledgeGraphWidget {
        let mut w = KnowledgeGraphWidget::with_settings(GraphSettings::default());
        let payload = GraphPayload::from_json_str(
            r#"{
                "nodes": [
                    {"id":"1","labels":["Person"],"properties":{"name":"张三"}},
                    {"id":"2","labels":["Organization"],"properties":{"name":"阿里巴巴公司"}},
                    {"id":"3","properties":{"name":"杭州市","source_id":"ep-9"}}
                ],
                "edges": [
                    {"id":"e1","source":"1","target":"2","type":"WORKS_FOR"},
                    {"id":"e2","source":"2","target":"3","type":"LOCATED_IN"}
                ]
            }"#,
        )
        .unwrap();
        w.set_payload(payload);
        w
    }

    #[test]
    fn load_populates_snapshot_and_styles() {
        let w = widget();
        let graph = w.snapshot().unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(w.styles().nodes.len(), 3);
        assert_eq!(w.styles().edges.len(), 2);
        assert!(w.report().unwrap().is_clean());
    }

    #[test]
    fn refresh_without_payload_is_none() {
        let mut w = KnowledgeGraphWidget::with_settings(GraphSettings::default());
        assert!(w.refresh().is_none());
        assert!(!w.is_loaded());
    }

    #[test]
    fn reload_clears_highlight() {
        let mut w = widget();
        w.highlight_paths(&["1"], NONE, NONE, NONE);
        assert!(w.highlight().is_active());
        w.refresh();
        assert_eq!(w.highlight(), &HighlightState::None);
    }

    #[test]
    fn step_keeps_styles_consistent_with_highlight() {
        let mut w = widget();
        w.highlight_paths(&["1"], &["e1"], &["1"], &["e1"]);
        let before = w.styles().clone();
        for _ in 0..5 {
            w.step();
        }
        assert_eq!(w.styles(), &before);
    }

    #[test]
    fn background_click_clears_highlight_and_reports_it() {
        let mut w = widget();
        w.highlight_paths(&["1"], NONE, NONE, NONE);
        w.apply_outcome(InputOutcome {
            click: Some(PointerTarget::Background),
            ..InputOutcome::default()
        });
        assert_eq!(w.highlight(), &HighlightState::None);
        assert_eq!(w.take_events(), vec![GraphEvent::HighlightCleared]);
    }

    #[test]
    fn background_click_and_escape_together_clear_once() {
        let mut w = widget();
        w.highlight_paths(&["1"], NONE, NONE, NONE);
        w.apply_outcome(InputOutcome {
            click: Some(PointerTarget::Background),
            clear_highlight: true,
            ..InputOutcome::default()
        });
        assert_eq!(w.highlight(), &HighlightState::None);
        assert_eq!(w.take_events(), vec![GraphEvent::HighlightCleared]);
    }

    #[test]
    fn emphasized_node_hits_out_to_its_drawn_rim() {
        let mut w = KnowledgeGraphWidget::with_settings(GraphSettings::default());
        w.set_payload(GraphPayload::from_json_str(r#"{"nodes":[{"id":"1"}]}"#).unwrap());
        let node = &w.snapshot().unwrap().nodes[0];
        let rim = node.position + Vec2::new(node.radius() * 1.2, 0.0);

        assert_eq!(w.spatial.hit_test(rim, 0.0), None);

        w.highlight_paths(&["1"], NONE, &["1"], NONE);
        assert_eq!(w.styles().node(0).unwrap().tier, Tier::ShortestPath);
        assert_eq!(w.spatial.hit_test(rim, 0.0), Some(0));

        w.clear_highlight();
        assert_eq!(w.spatial.hit_test(rim, 0.0), None);
    }

    #[test]
    fn escape_without_highlight_is_silent() {
        let mut w = widget();
        w.apply_outcome(InputOutcome {
            clear_highlight: true,
            ..InputOutcome::default()
        });
        assert!(w.take_events().is_empty());
    }

    #[test]
    fn node_click_selects_without_touching_highlight() {
        let mut w = widget();
        w.highlight_paths(&["2"], NONE, NONE, NONE);
        w.apply_outcome(InputOutcome {
            click: Some(PointerTarget::Node(0)),
            ..InputOutcome::default()
        });
        assert!(w.highlight().is_active());
        let events = w.take_events();
        assert!(matches!(&events[..], [GraphEvent::NodeSelected { node }] if node.id == "1"));
    }

    #[test]
    fn double_click_on_provenance_node_requests_preview() {
        let mut w = widget();
        w.apply_outcome(InputOutcome {
            double_click: Some(PointerTarget::Node(2)),
            ..InputOutcome::default()
        });
        assert_eq!(
            w.take_events(),
            vec![GraphEvent::SourcePreviewRequested {
                node_id: "3".into(),
                source_id: "ep-9".into(),
            }]
        );
    }

    #[test]
    fn zoom_controls_respect_limits() {
        let mut w = widget();
        for _ in 0..50 {
            w.zoom_in();
        }
        assert_eq!(w.camera().target_zoom(), w.settings().camera.max_zoom);
        w.reset_zoom();
        assert_eq!(w.camera().target_zoom(), 1.0);
        assert_eq!(w.camera().target_center(), w.simulation().unwrap().center);
    }

    #[test]
    fn camera_uses_the_widget_spring_settings() {
        let mut slow = GraphSettings::default();
        slow.animation.springs.insert(
            "medium".to_string(),
            crate::config::SpringConfigYaml {
                stiffness: 5.0,
                damping: 1.0,
            },
        );
        let mut slow = KnowledgeGraphWidget::with_settings(slow);
        let mut normal = KnowledgeGraphWidget::with_settings(GraphSettings::default());

        let mut zoomed = Vec::new();
        for w in [&mut slow, &mut normal] {
            w.zoom_in();
            let mut camera = w.camera().clone();
            camera.update(0.05);
            zoomed.push(camera.zoom());
        }
        assert!(zoomed[0] < zoomed[1], "{:?}", zoomed);
    }

    #[test]
    fn clear_drops_everything() {
        let mut w = widget();
        w.clear();
        assert!(w.snapshot().is_none());
        assert!(w.styles().nodes.is_empty());
        assert!(w.refresh().is_none());
    }
}
