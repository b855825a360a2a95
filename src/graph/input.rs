//! Input handling - pointer and keyboard interaction with the graph
//!
//! Drag on a node pins it under the pointer; drag on the background pans.
//! Wheel zooms around the pointer. Clicks are resolved to a
//! [`PointerTarget`] and handed back to the widget, which owns highlight
//! state and the event queue. A pointer-up that ends a drag never counts
//! as a click.

use egui::{Key, Pos2, Rect, Response, Vec2};

use super::camera::Camera2D;
use super::edges::EdgeCurve;
use super::force_sim::ForceSimulation;
use super::spatial::SpatialIndex;
use super::types::{GraphEvent, GraphSnapshot};

/// Screen pixels of slack around node rims
const NODE_HIT_TOLERANCE: f32 = 2.0;

/// Screen pixels either side of an edge that still count as on it
const EDGE_HIT_TOLERANCE: f32 = 5.0;

// =============================================================================
// INPUT STATE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Node index under the pointer
    pub hovered_node: Option<usize>,
    /// Edge index under the pointer (only when no node is)
    pub hovered_edge: Option<usize>,
    /// Id of the node held by a drag
    pub dragged_node: Option<String>,
    /// Background drag in progress
    pub is_panning: bool,
    /// World offset from pointer to the held node's center
    drag_offset: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged_node.is_some() || self.is_panning
    }

    /// Forget everything tied to a particular graph (reload)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Node(usize),
    Edge(usize),
    Background,
}

/// Requests for the widget, collected over one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputOutcome {
    pub click: Option<PointerTarget>,
    pub double_click: Option<PointerTarget>,
    pub clear_highlight: bool,
    pub fit: bool,
    pub reset_zoom: bool,
    /// A node drag was released this frame
    pub drag_released: bool,
    pub needs_repaint: bool,
}

// =============================================================================
// HIT TESTING
// =============================================================================

/// Resolve a world position to a node, then an edge, then background.
/// Tolerances are in screen pixels.
pub fn pointer_target(
    world: Pos2,
    zoom: f32,
    spatial: &SpatialIndex,
    routes: &[Option<EdgeCurve>],
) -> PointerTarget {
    let zoom = zoom.max(f32::EPSILON);

    if let Some(node) = spatial.hit_test(world, NODE_HIT_TOLERANCE / zoom) {
        return PointerTarget::Node(node);
    }

    let tolerance = EDGE_HIT_TOLERANCE / zoom;
    routes
        .iter()
        .enumerate()
        .filter_map(|(i, route)| route.as_ref().map(|c| (i, c)))
        .filter(|(_, curve)| curve.bounding_rect().expand(tolerance).contains(world))
        .map(|(i, curve)| (i, curve.distance_to(world)))
        .filter(|(_, d)| *d <= tolerance)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(PointerTarget::Background, |(i, _)| PointerTarget::Edge(i))
}

/// Outcome of a click
#[derive(Debug, Clone, PartialEq)]
pub struct ClickResolution {
    pub event: Option<GraphEvent>,
    /// Background click while a highlight is active
    pub clear_highlight: bool,
}

/// Map a click target to the event it raises
pub fn resolve_click(
    target: PointerTarget,
    graph: &GraphSnapshot,
    highlight_active: bool,
) -> ClickResolution {
    match target {
        PointerTarget::Node(i) => ClickResolution {
            event: graph
                .nodes
                .get(i)
                .map(|node| GraphEvent::NodeSelected { node: node.clone() }),
            clear_highlight: false,
        },
        PointerTarget::Edge(i) => ClickResolution {
            event: graph
                .edges
                .get(i)
                .map(|edge| GraphEvent::EdgeSelected { edge: edge.clone() }),
            clear_highlight: false,
        },
        PointerTarget::Background => ClickResolution {
            event: highlight_active.then_some(GraphEvent::HighlightCleared),
            clear_highlight: highlight_active,
        },
    }
}

/// Double-click on a node with provenance asks the host for a preview
pub fn resolve_double_click(target: PointerTarget, graph: &GraphSnapshot) -> Option<GraphEvent> {
    let PointerTarget::Node(i) = target else {
        return None;
    };
    let node = graph.nodes.get(i)?;
    let source_id = node.source_id.clone()?;
    Some(GraphEvent::SourcePreviewRequested {
        node_id: node.id.clone(),
        source_id,
    })
}

// =============================================================================
// INPUT HANDLER
// =============================================================================

pub struct InputHandler;

impl InputHandler {
    /// Process one frame of input.
    ///
    /// Camera and layout changes are applied directly; selection and
    /// highlight requests come back in the outcome.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_input(
        response: &Response,
        camera: &mut Camera2D,
        state: &mut InputState,
        sim: &mut ForceSimulation,
        spatial: &SpatialIndex,
        routes: &[Option<EdgeCurve>],
        screen_rect: Rect,
        scroll_sensitivity: f32,
    ) -> InputOutcome {
        let mut outcome = InputOutcome::default();
        let zoom = camera.zoom();
        let to_world = |camera: &Camera2D, p: Pos2| camera.screen_to_world(p, screen_rect);

        let pointer = response.hover_pos().or_else(|| response.interact_pointer_pos());

        // Hover (frozen while dragging)
        if !state.is_dragging() {
            let target = pointer
                .map(|p| pointer_target(to_world(camera, p), zoom, spatial, routes))
                .unwrap_or(PointerTarget::Background);
            let (node, edge) = match target {
                PointerTarget::Node(i) => (Some(i), None),
                PointerTarget::Edge(i) => (None, Some(i)),
                PointerTarget::Background => (None, None),
            };
            if node != state.hovered_node || edge != state.hovered_edge {
                outcome.needs_repaint = true;
            }
            state.hovered_node = node;
            state.hovered_edge = edge;
        }

        if state.hovered_node.is_some() || state.dragged_node.is_some() {
            response.ctx.set_cursor_icon(if state.dragged_node.is_some() {
                egui::CursorIcon::Grabbing
            } else {
                egui::CursorIcon::PointingHand
            });
        }

        // Drag start: node under the press point is pinned, else pan
        if response.drag_started() {
            let press = response
                .ctx
                .input(|i| i.pointer.press_origin())
                .or(pointer);
            let hit = press.and_then(|p| {
                let world = to_world(camera, p);
                let i = spatial.hit_test(world, NODE_HIT_TOLERANCE / zoom.max(f32::EPSILON))?;
                let node = sim.graph().nodes.get(i)?;
                Some((node.id.clone(), node.position - world))
            });
            match hit {
                Some((id, offset)) => {
                    state.drag_offset = offset;
                    sim.pin(&id);
                    tracing::debug!("drag start on node {}", id);
                    state.dragged_node = Some(id);
                }
                None => state.is_panning = true,
            }
        }

        if response.dragged() {
            if let Some(id) = state.dragged_node.clone() {
                if let Some(p) = response.interact_pointer_pos() {
                    let target = to_world(camera, p) + state.drag_offset;
                    sim.move_node(&id, target);
                    outcome.needs_repaint = true;
                }
            } else if state.is_panning {
                let delta = response.drag_delta();
                if delta != Vec2::ZERO {
                    camera.pan(delta);
                    outcome.needs_repaint = true;
                }
            }
        }

        let drag_ended = response.drag_stopped();
        if drag_ended {
            if let Some(id) = state.dragged_node.take() {
                sim.unpin(&id);
                tracing::debug!("drag released node {}", id);
                outcome.drag_released = true;
            }
            state.is_panning = false;
            state.drag_offset = Vec2::ZERO;
            outcome.needs_repaint = true;
        }

        // Clicks, never on the frame a drag ended
        if !drag_ended && response.clicked() {
            outcome.click = Some(
                pointer
                    .map(|p| pointer_target(to_world(camera, p), zoom, spatial, routes))
                    .unwrap_or(PointerTarget::Background),
            );
            outcome.needs_repaint = true;
        }
        if !drag_ended && response.double_clicked() {
            outcome.double_click = Some(
                pointer
                    .map(|p| pointer_target(to_world(camera, p), zoom, spatial, routes))
                    .unwrap_or(PointerTarget::Background),
            );
        }

        // Wheel zoom around the pointer
        if response.hovered() {
            let scroll = response.ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                if let Some(p) = pointer {
                    camera.zoom_at((scroll * scroll_sensitivity).exp(), p, screen_rect);
                    outcome.needs_repaint = true;
                }
            }
        }

        // Shortcuts yield to text fields elsewhere in the UI
        if (response.hovered() || response.has_focus()) && !response.ctx.wants_keyboard_input() {
            Self::handle_keyboard(response, camera, &mut outcome);
        }

        outcome
    }

    fn handle_keyboard(response: &Response, camera: &mut Camera2D, outcome: &mut InputOutcome) {
        response.ctx.input(|i| {
            if i.key_pressed(Key::Escape) {
                outcome.clear_highlight = true;
            }
            if i.key_pressed(Key::R) || i.key_pressed(Key::F) {
                outcome.fit = true;
            }
            if i.key_pressed(Key::Plus) || i.key_pressed(Key::Equals) {
                camera.zoom_in();
                outcome.needs_repaint = true;
            }
            if i.key_pressed(Key::Minus) {
                camera.zoom_out();
                outcome.needs_repaint = true;
            }
            if i.key_pressed(Key::Num0) {
                outcome.reset_zoom = true;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edges::{curve_strengths, route_edges};
    use crate::graph::normalize::normalize;
    use crate::graph::types::GraphPayload;

    /// a (0,0) --ab--> b (200,0); c has provenance
    fn fixture() -> (GraphSnapshot, SpatialIndex, Vec<Option<EdgeCurve>>) {
        let payload = GraphPayload::from_json_str(
            r#"{
                "nodes": [
                    {"id":"a"},
                    {"id":"b"},
                    {"id":"c","properties":{"source_id":"ep-1"}}
                ],
                "edges": [{"id":"ab","source":"a","target":"b","type":"KNOWS"}]
            }"#,
        )
        .unwrap();
        let (mut graph, _) = normalize(&payload);
        graph.nodes[0].position = Pos2::new(0.0, 0.0);
        graph.nodes[1].position = Pos2::new(200.0, 0.0);
        graph.nodes[2].position = Pos2::new(0.0, 300.0);

        let spatial = SpatialIndex::from_graph(&graph);
        let routes = route_edges(&graph, &curve_strengths(&graph), |i| graph.nodes[i].radius());
        (graph, spatial, routes)
    }

    /// Runs `InputHandler` inside real egui frames over an 800x600 canvas
    struct Canvas {
        ctx: egui::Context,
        time: f64,
        camera: Camera2D,
        state: InputState,
        sim: ForceSimulation,
        spatial: SpatialIndex,
        routes: Vec<Option<EdgeCurve>>,
    }

    impl Canvas {
        /// Camera centered on node `a`, which sits at the screen center
        fn new() -> Self {
            let (graph, _, _) = fixture();
            let sim = ForceSimulation::new(graph, crate::config::ForceSettings::default());
            let graph = sim.graph();
            let spatial = SpatialIndex::from_graph(graph);
            let routes = route_edges(graph, &curve_strengths(graph), |i| graph.nodes[i].radius());
            let mut camera = Camera2D::default();
            camera.reset(graph.nodes[0].position);
            camera.snap_to_target();
            Self {
                ctx: egui::Context::default(),
                time: 0.0,
                camera,
                state: InputState::new(),
                sim,
                spatial,
                routes,
            }
        }

        fn frame(&mut self, events: Vec<egui::Event>) -> InputOutcome {
            self.time += 1.0 / 60.0;
            let raw = egui::RawInput {
                screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
                time: Some(self.time),
                events,
                ..Default::default()
            };
            let mut outcome = InputOutcome::default();
            let ctx = self.ctx.clone();
            let _ = ctx.run(raw, |ctx| {
                egui::CentralPanel::default()
                    .frame(egui::Frame::none())
                    .show(ctx, |ui| {
                        let response =
                            ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
                        outcome = InputHandler::handle_input(
                            &response,
                            &mut self.camera,
                            &mut self.state,
                            &mut self.sim,
                            &self.spatial,
                            &self.routes,
                            response.rect,
                            0.002,
                        );
                    });
            });
            outcome
        }

        fn move_to(&mut self, x: f32, y: f32) -> InputOutcome {
            self.frame(vec![egui::Event::PointerMoved(Pos2::new(x, y))])
        }

        fn button(&mut self, x: f32, y: f32, pressed: bool) -> InputOutcome {
            self.frame(vec![egui::Event::PointerButton {
                pos: Pos2::new(x, y),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            }])
        }

        fn position_of(&self, id: &str) -> Pos2 {
            self.sim.graph().get_node(id).unwrap().position
        }
    }

    #[test]
    fn dragging_a_node_pins_it_and_release_is_not_a_click() {
        let mut canvas = Canvas::new();
        let start = canvas.position_of("a");

        // Widget rects are registered one frame before they can be hit
        canvas.move_to(400.0, 300.0);
        canvas.move_to(400.0, 300.0);
        assert_eq!(canvas.state.hovered_node, Some(0));

        assert_eq!(canvas.button(400.0, 300.0, true).click, None);
        assert!(!canvas.sim.is_pinned("a"));

        canvas.move_to(430.0, 300.0);
        assert!(canvas.sim.is_pinned("a"));
        assert_eq!(canvas.state.dragged_node.as_deref(), Some("a"));

        canvas.move_to(460.0, 310.0);
        assert!(canvas.sim.is_pinned("a"));
        assert!((canvas.position_of("a") - (start + Vec2::new(60.0, 10.0))).length() < 1e-3);

        let released = canvas.button(460.0, 310.0, false);
        assert!(released.drag_released);
        assert_eq!(released.click, None);
        assert_eq!(released.double_click, None);
        assert!(!canvas.sim.is_pinned("a"));
        assert!(!canvas.state.is_dragging());
    }

    #[test]
    fn press_and_release_in_place_clicks_the_node() {
        let mut canvas = Canvas::new();
        canvas.move_to(400.0, 300.0);
        canvas.move_to(400.0, 300.0);

        canvas.button(400.0, 300.0, true);
        let released = canvas.button(400.0, 300.0, false);

        assert_eq!(released.click, Some(PointerTarget::Node(0)));
        assert!(!released.drag_released);
        assert!(!canvas.sim.is_pinned("a"));
    }

    #[test]
    fn background_drag_pans_without_clicking() {
        let mut canvas = Canvas::new();
        let before = canvas.camera.center();
        // Far from every node and the a-b edge
        canvas.move_to(100.0, 550.0);
        canvas.move_to(100.0, 550.0);

        canvas.button(100.0, 550.0, true);
        canvas.move_to(140.0, 550.0);
        assert!(canvas.state.is_panning);
        canvas.move_to(180.0, 550.0);
        let released = canvas.button(180.0, 550.0, false);

        assert_eq!(released.click, None);
        assert!(!released.drag_released);
        assert!(!canvas.state.is_panning);
        assert_ne!(canvas.camera.target_center(), before);
    }

    #[test]
    fn nodes_take_precedence_over_edges() {
        let (_, spatial, routes) = fixture();
        assert_eq!(
            pointer_target(Pos2::new(5.0, 0.0), 1.0, &spatial, &routes),
            PointerTarget::Node(0)
        );
    }

    #[test]
    fn edge_hit_within_tolerance() {
        let (_, spatial, routes) = fixture();
        assert_eq!(
            pointer_target(Pos2::new(100.0, 3.0), 1.0, &spatial, &routes),
            PointerTarget::Edge(0)
        );
        assert_eq!(
            pointer_target(Pos2::new(100.0, 30.0), 1.0, &spatial, &routes),
            PointerTarget::Background
        );
    }

    #[test]
    fn tolerance_scales_with_zoom() {
        let (_, spatial, routes) = fixture();
        // 8 world units is 4 px at 50% zoom
        assert_eq!(
            pointer_target(Pos2::new(100.0, 8.0), 0.5, &spatial, &routes),
            PointerTarget::Edge(0)
        );
        assert_eq!(
            pointer_target(Pos2::new(100.0, 8.0), 2.0, &spatial, &routes),
            PointerTarget::Background
        );
    }

    #[test]
    fn clicks_raise_selection_events() {
        let (graph, _, _) = fixture();

        let on_node = resolve_click(PointerTarget::Node(1), &graph, true);
        assert!(matches!(on_node.event, Some(GraphEvent::NodeSelected { ref node }) if node.id == "b"));
        assert!(!on_node.clear_highlight);

        let on_edge = resolve_click(PointerTarget::Edge(0), &graph, false);
        assert!(matches!(on_edge.event, Some(GraphEvent::EdgeSelected { ref edge }) if edge.id == "ab"));
    }

    #[test]
    fn background_click_clears_only_an_active_highlight() {
        let (graph, _, _) = fixture();

        let active = resolve_click(PointerTarget::Background, &graph, true);
        assert_eq!(active.event, Some(GraphEvent::HighlightCleared));
        assert!(active.clear_highlight);

        let idle = resolve_click(PointerTarget::Background, &graph, false);
        assert_eq!(idle.event, None);
        assert!(!idle.clear_highlight);
    }

    #[test]
    fn double_click_requests_source_preview() {
        let (graph, _, _) = fixture();
        assert_eq!(
            resolve_double_click(PointerTarget::Node(2), &graph),
            Some(GraphEvent::SourcePreviewRequested {
                node_id: "c".into(),
                source_id: "ep-1".into(),
            })
        );
        assert_eq!(resolve_double_click(PointerTarget::Node(0), &graph), None);
        assert_eq!(resolve_double_click(PointerTarget::Background, &graph), None);
    }
}
