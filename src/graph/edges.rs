//! Edge routing and rendering
//!
//! Edges are quadratic bezier curves routed in world space and mapped to the
//! screen for drawing. Single edges are straight; parallel edges between the
//! same pair fan out; self-loops are drawn as a teardrop above the node. Curves are trimmed so the arrow tip
//! lands on the target node's rim.

use egui::{Color32, Pos2, Stroke, Vec2};

use super::types::GraphSnapshot;

// =============================================================================
// BEZIER CURVE
// =============================================================================

/// Quadratic bezier curve for edge routing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    pub from: Pos2,
    pub to: Pos2,
    pub control: Pos2,
}

impl EdgeCurve {
    /// Curve between two points; `curve_strength` offsets the control point
    /// perpendicular to the chord, as a fraction of its length
    pub fn new(from: Pos2, to: Pos2, curve_strength: f32) -> Self {
        let delta = to - from;
        let perpendicular = Vec2::new(-delta.y, delta.x).normalized();
        let control = from.lerp(to, 0.5) + perpendicular * delta.length() * curve_strength;
        Self { from, to, control }
    }

    pub fn straight(from: Pos2, to: Pos2) -> Self {
        Self {
            from,
            to,
            control: from.lerp(to, 0.5),
        }
    }

    /// Teardrop loop leaving and re-entering the top of a circle
    pub fn self_loop(center: Pos2, radius: f32) -> Self {
        let up = -std::f32::consts::FRAC_PI_2;
        Self {
            from: center + Vec2::angled(up - 0.6) * radius,
            to: center + Vec2::angled(up + 0.6) * radius,
            control: center + Vec2::angled(up) * radius * 4.0,
        }
    }

    pub fn point_at(&self, t: f32) -> Pos2 {
        let mt = 1.0 - t;
        let from = self.from.to_vec2() * (mt * mt);
        let control = self.control.to_vec2() * (2.0 * mt * t);
        let to = self.to.to_vec2() * (t * t);
        (from + control + to).to_pos2()
    }

    /// Direction of travel at the end of the curve (for the arrow)
    pub fn end_direction(&self) -> Vec2 {
        let dir = self.to - self.control;
        if dir.length_sq() > 0.0 {
            dir.normalized()
        } else {
            (self.to - self.from).normalized()
        }
    }

    fn start_direction(&self) -> Vec2 {
        let dir = self.control - self.from;
        if dir.length_sq() > 0.0 {
            dir.normalized()
        } else {
            (self.to - self.from).normalized()
        }
    }

    pub fn midpoint(&self) -> Pos2 {
        self.point_at(0.5)
    }

    /// Pull both ends in along the curve so they stop at the node rims
    pub fn trimmed(&self, from_radius: f32, to_radius: f32) -> Self {
        Self {
            from: self.from + self.start_direction() * from_radius,
            to: self.to - self.end_direction() * to_radius,
            control: self.control,
        }
    }

    /// Sampled polyline, `BEZIER_SEGMENTS + 1` points
    pub fn points(&self) -> Vec<Pos2> {
        (0..=BEZIER_SEGMENTS)
            .map(|i| self.point_at(i as f32 / BEZIER_SEGMENTS as f32))
            .collect()
    }

    /// Apply a point transform (world to screen is a similarity, so the
    /// mapped curve is the curve of the mapped points)
    pub fn map(&self, f: impl Fn(Pos2) -> Pos2) -> Self {
        Self {
            from: f(self.from),
            to: f(self.to),
            control: f(self.control),
        }
    }

    /// Loose bounding box (contains the whole curve)
    pub fn bounding_rect(&self) -> egui::Rect {
        egui::Rect::from_points(&[self.from, self.to, self.control])
    }

    /// Shortest distance from `point` to the sampled curve
    pub fn distance_to(&self, point: Pos2) -> f32 {
        self.points()
            .windows(2)
            .map(|w| distance_to_segment(point, w[0], w[1]))
            .fold(f32::INFINITY, f32::min)
    }
}

pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return (point - a).length();
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length()
}

// =============================================================================
// PARALLEL EDGES
// =============================================================================

/// Spacing between parallel edges, as curve strength
const PARALLEL_SPREAD: f32 = 0.2;

/// Curve strength for every edge, index-aligned with `graph.edges`.
///
/// Edges sharing an unordered endpoint pair are spread symmetrically about
/// the chord; a lone edge is straight. Strength is relative to the edge's
/// own direction, so a reversed edge gets the negated offset.
pub fn curve_strengths(graph: &GraphSnapshot) -> Vec<f32> {
    use std::collections::HashMap;

    let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (i, edge) in graph.edges.iter().enumerate() {
        let key = if edge.source <= edge.target {
            (edge.source.as_str(), edge.target.as_str())
        } else {
            (edge.target.as_str(), edge.source.as_str())
        };
        groups.entry(key).or_default().push(i);
    }

    let mut strengths = vec![0.0; graph.edges.len()];
    for ((low, _), members) in groups {
        let middle = (members.len() as f32 - 1.0) / 2.0;
        for (slot, &i) in members.iter().enumerate() {
            let offset = (slot as f32 - middle) * PARALLEL_SPREAD;
            let forward = graph.edges[i].source == low;
            strengths[i] = if forward { offset } else { -offset };
        }
    }
    strengths
}

/// World-space route for every edge, index-aligned with `graph.edges`.
///
/// `radius_of(i)` is the drawn radius of node `i`; curves are trimmed to it.
pub fn route_edges(
    graph: &GraphSnapshot,
    strengths: &[f32],
    radius_of: impl Fn(usize) -> f32,
) -> Vec<Option<EdgeCurve>> {
    graph
        .edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            let s = graph.node_index(&edge.source)?;
            let t = graph.node_index(&edge.target)?;
            let (from, to) = (graph.nodes[s].position, graph.nodes[t].position);
            if s == t {
                return Some(EdgeCurve::self_loop(from, radius_of(s)));
            }
            let strength = strengths.get(i).copied().unwrap_or(0.0);
            Some(EdgeCurve::new(from, to, strength).trimmed(radius_of(s), radius_of(t)))
        })
        .collect()
}

// =============================================================================
// RENDERING
// =============================================================================

const BEZIER_SEGMENTS: usize = 16;

pub fn render_edge(painter: &egui::Painter, curve: &EdgeCurve, stroke: Stroke) {
    if curve.control == curve.from.lerp(curve.to, 0.5) {
        painter.line_segment([curve.from, curve.to], stroke);
    } else {
        painter.add(egui::Shape::line(curve.points(), stroke));
    }
}

/// Arrow head size at 100% zoom
pub const ARROW_SIZE: f32 = 8.0;

/// Filled triangle with its tip at `tip`, pointing along `direction`
pub fn render_arrow_head(painter: &egui::Painter, tip: Pos2, direction: Vec2, size: f32, color: Color32) {
    let dir = direction.normalized();
    let perp = Vec2::new(-dir.y, dir.x);

    painter.add(egui::Shape::convex_polygon(
        vec![
            tip,
            tip - dir * size + perp * size * 0.5,
            tip - dir * size - perp * size * 0.5,
        ],
        color,
        Stroke::NONE,
    ));
}

/// Relation name in a pill at `position`
pub fn render_edge_label(
    painter: &egui::Painter,
    position: Pos2,
    label: &str,
    zoom: f32,
    bg_color: Color32,
    text_color: Color32,
) {
    let font_size = (9.0 * zoom).clamp(8.0, 14.0);
    let padding = Vec2::new(5.0, 2.0);

    let galley = painter.layout_no_wrap(
        label.to_string(),
        egui::FontId::proportional(font_size),
        text_color,
    );

    let text_size = galley.size();
    let pill_size = text_size + padding * 2.0;
    let pill_rect = egui::Rect::from_center_size(position, pill_size);

    painter.rect_filled(pill_rect, pill_size.y / 2.0, bg_color);
    painter.galley(position - text_size / 2.0, galley, text_color);
}

pub fn should_show_edge_label(label: &str, zoom: f32, min_zoom: f32) -> bool {
    !label.is_empty() && zoom >= min_zoom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize::normalize;
    use crate::graph::types::GraphPayload;

    #[test]
    fn straight_curve_midpoint() {
        let c = EdgeCurve::straight(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0));
        assert_eq!(c.midpoint(), Pos2::new(50.0, 0.0));
    }

    #[test]
    fn trimming_stops_at_the_rim() {
        let c = EdgeCurve::straight(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0)).trimmed(10.0, 20.0);
        assert!((c.from.x - 10.0).abs() < 1e-4);
        assert!((c.to.x - 80.0).abs() < 1e-4);
        assert!((c.end_direction() - Vec2::X).length() < 1e-4);
    }

    #[test]
    fn segment_distance() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(2.0, 2.0), a, a), 8.0_f32.sqrt());
    }

    #[test]
    fn curved_edge_hit_distance() {
        let c = EdgeCurve::new(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0), 0.2);
        assert!(c.distance_to(c.midpoint()) < 0.5);
        assert!(c.distance_to(Pos2::new(50.0, 0.0)) > 5.0);
    }

    #[test]
    fn routes_follow_node_positions() {
        let payload = GraphPayload::from_json_str(
            r#"{"nodes":[{"id":"a"},{"id":"b"}],
                "edges":[{"id":"ab","source":"a","target":"b"},{"id":"aa","source":"a","target":"a"}]}"#,
        )
        .unwrap();
        let (mut graph, _) = normalize(&payload);
        graph.nodes[0].position = Pos2::new(0.0, 0.0);
        graph.nodes[1].position = Pos2::new(100.0, 0.0);

        let routes = route_edges(&graph, &curve_strengths(&graph), |_| 10.0);
        let ab = routes[0].unwrap();
        assert!((ab.to - Pos2::new(90.0, 0.0)).length() < 1e-4);
        let aa = routes[1].unwrap();
        assert!(aa.midpoint().y < 0.0);
    }

    #[test]
    fn self_loop_sits_above_node() {
        let c = EdgeCurve::self_loop(Pos2::new(0.0, 0.0), 10.0);
        assert!(c.midpoint().y < -10.0);
    }

    #[test]
    fn parallel_edges_fan_out() {
        let payload = GraphPayload::from_json_str(
            r#"{
                "nodes": [{"id":"a"},{"id":"b"},{"id":"c"}],
                "edges": [
                    {"id":"e1","source":"a","target":"b"},
                    {"id":"e2","source":"b","target":"a"},
                    {"id":"e3","source":"b","target":"c"}
                ]
            }"#,
        )
        .unwrap();
        let (graph, _) = normalize(&payload);
        let s = curve_strengths(&graph);

        assert_eq!(s[2], 0.0);
        assert!(s[0] != 0.0 && s[1] != 0.0);

        // Reversed edge lands on the other side of the chord
        let mid = |i: usize| {
            let (from, to) = if graph.edges[i].source == "a" {
                (Pos2::ZERO, Pos2::new(100.0, 0.0))
            } else {
                (Pos2::new(100.0, 0.0), Pos2::ZERO)
            };
            EdgeCurve::new(from, to, s[i]).midpoint()
        };
        assert!((mid(0).y - mid(1).y).abs() > 5.0);
    }
}
