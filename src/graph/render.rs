//! Rendering - draws edges, nodes, labels and chrome using egui::Painter
//!
//! World coordinates are transformed by the camera. Emphasized elements are
//! painted last so they sit on top of dimmed ones. Only elements that
//! intersect the visible world rectangle are drawn.

use egui::{Align2, FontId, Pos2, Rect, Stroke, Vec2};

use crate::config::HighlightSettings;

use super::camera::Camera2D;
use super::colors::{
    hover_ring_color, label_text_color, panel_background, panel_border, secondary_text_color,
    with_opacity,
};
use super::edges::{
    render_arrow_head, render_edge, render_edge_label, should_show_edge_label, EdgeCurve,
    ARROW_SIZE,
};
use super::highlight::{StyleTable, Tier};
use super::spatial::SpatialIndex;
use super::types::GraphSnapshot;

/// Node labels longer than this are cut with an ellipsis
const MAX_LABEL_CHARS: usize = 24;

// =============================================================================
// RENDER INPUTS
// =============================================================================

/// Everything one frame of drawing needs
pub struct RenderContext<'a> {
    pub graph: &'a GraphSnapshot,
    pub styles: &'a StyleTable,
    /// World-space edge routes, index-aligned with `graph.edges`
    pub routes: &'a [Option<EdgeCurve>],
    pub spatial: &'a SpatialIndex,
    pub camera: &'a Camera2D,
    pub settings: &'a HighlightSettings,
    pub hovered_node: Option<usize>,
    pub hovered_edge: Option<usize>,
}

/// Status figures for the overlay panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromeInfo {
    pub nodes: usize,
    pub edges: usize,
    pub zoom: f32,
    /// (nodes, edges) emphasized by the active highlight
    pub highlight: Option<(usize, usize)>,
    /// Records dropped by normalization
    pub dropped: usize,
    pub settling: bool,
}

impl ChromeInfo {
    /// Overlay lines, top to bottom
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} nodes · {} edges · {:.0}%",
            self.nodes,
            self.edges,
            self.zoom * 100.0
        )];
        if let Some((n, e)) = self.highlight {
            lines.push(format!("Highlight: {} nodes, {} edges (Esc to clear)", n, e));
        }
        if self.dropped > 0 {
            lines.push(format!("{} invalid records skipped", self.dropped));
        }
        if self.settling {
            lines.push("Layout settling…".to_string());
        }
        lines
    }
}

/// Paint order: dimmed, normal, highlighted, shortest path
fn tier_rank(tier: Tier) -> u8 {
    match tier {
        Tier::Dimmed => 0,
        Tier::Normal => 1,
        Tier::Highlighted => 2,
        Tier::ShortestPath => 3,
    }
}

/// Indices sorted by paint order; stable within a tier
pub fn draw_order(tiers: impl Iterator<Item = Tier>) -> Vec<usize> {
    let mut order: Vec<(u8, usize)> = tiers.enumerate().map(|(i, t)| (tier_rank(t), i)).collect();
    order.sort_by_key(|&(rank, i)| (rank, i));
    order.into_iter().map(|(_, i)| i).collect()
}

pub fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let head: String = name.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

// =============================================================================
// GRAPH RENDERER
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct GraphRenderer;

impl GraphRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, painter: &egui::Painter, ctx: &RenderContext<'_>, screen_rect: Rect) {
        let visible = ctx.camera.visible_bounds(screen_rect).expand(40.0);
        self.render_edges(painter, ctx, screen_rect, visible);
        self.render_nodes(painter, ctx, screen_rect, visible);
    }

    fn render_edges(
        &self,
        painter: &egui::Painter,
        ctx: &RenderContext<'_>,
        screen_rect: Rect,
        visible: Rect,
    ) {
        let zoom = ctx.camera.zoom();
        let width_scale = zoom.clamp(0.5, 2.0);
        let to_screen = |p: Pos2| ctx.camera.world_to_screen(p, screen_rect);

        for i in draw_order(ctx.styles.edges.iter().map(|s| s.tier)) {
            let (Some(Some(route)), Some(style), Some(edge)) = (
                ctx.routes.get(i),
                ctx.styles.edge(i),
                ctx.graph.edges.get(i),
            ) else {
                continue;
            };
            if !route.bounding_rect().intersects(visible) {
                continue;
            }

            let hovered = ctx.hovered_edge == Some(i);
            let width = style.width * width_scale + if hovered { 1.5 } else { 0.0 };
            let curve = route.map(to_screen);

            let arrow = ARROW_SIZE * zoom.clamp(0.6, 1.5) * (style.width / 1.2).max(1.0).sqrt();
            render_edge(painter, &curve, Stroke::new(width, style.color));
            render_arrow_head(painter, curve.to, curve.end_direction(), arrow, style.color);

            if style.tier != Tier::Dimmed
                && should_show_edge_label(edge.label(), zoom, ctx.settings.edge_label_min_zoom)
            {
                render_edge_label(
                    painter,
                    curve.midpoint(),
                    edge.label(),
                    zoom,
                    panel_background(),
                    with_opacity(secondary_text_color(), style.opacity),
                );
            }
        }
    }

    fn render_nodes(
        &self,
        painter: &egui::Painter,
        ctx: &RenderContext<'_>,
        screen_rect: Rect,
        visible: Rect,
    ) {
        let zoom = ctx.camera.zoom();
        let on_screen = ctx.spatial.query_rect(visible);
        let tiers = on_screen
            .iter()
            .map(|&i| ctx.styles.node(i).map_or(Tier::Normal, |s| s.tier));

        for slot in draw_order(tiers) {
            let i = on_screen[slot];
            let (Some(node), Some(style)) = (ctx.graph.nodes.get(i), ctx.styles.node(i)) else {
                continue;
            };

            let center = ctx.camera.world_to_screen(node.position, screen_rect);
            let radius = node.radius() * style.radius_scale * zoom;

            painter.circle_filled(center, radius, style.fill);
            painter.circle_stroke(center, radius, style.stroke);

            if ctx.hovered_node == Some(i) {
                painter.circle_stroke(center, radius + 3.0, Stroke::new(2.0, hover_ring_color()));
            }

            if style.show_label && radius >= ctx.settings.node_label_min_radius {
                let font_size = (11.0 * zoom).clamp(9.0, 16.0);
                painter.text(
                    center + Vec2::new(0.0, radius + 3.0),
                    Align2::CENTER_TOP,
                    truncate_label(&node.name, MAX_LABEL_CHARS),
                    FontId::proportional(font_size),
                    with_opacity(label_text_color(), style.opacity),
                );
            }
        }
    }

    /// Status panel in the top-left corner
    pub fn render_chrome(&self, painter: &egui::Painter, info: &ChromeInfo, screen_rect: Rect) {
        let lines = info.lines();
        let font = FontId::proportional(12.0);
        let line_height = 16.0;
        let padding = Vec2::new(10.0, 6.0);

        let width = lines
            .iter()
            .map(|l| {
                painter
                    .layout_no_wrap(l.clone(), font.clone(), label_text_color())
                    .size()
                    .x
            })
            .fold(0.0_f32, f32::max);
        let panel = Rect::from_min_size(
            screen_rect.min + Vec2::splat(10.0),
            Vec2::new(width, lines.len() as f32 * line_height) + padding * 2.0,
        );

        painter.rect_filled(panel, 6.0, panel_background());
        painter.rect_stroke(panel, 6.0, Stroke::new(1.0, panel_border()));

        for (row, line) in lines.into_iter().enumerate() {
            let color = if row == 0 {
                label_text_color()
            } else {
                secondary_text_color()
            };
            painter.text(
                panel.min + padding + Vec2::new(0.0, row as f32 * line_height),
                Align2::LEFT_TOP,
                line,
                font.clone(),
                color,
            );
        }
    }
}
