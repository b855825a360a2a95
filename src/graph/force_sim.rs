//! Force-directed layout for the knowledge graph
//!
//! Discrete steps, one per frame. Each step:
//! - link force pulls connected nodes toward `link_distance`
//! - many-body repulsion (inverse square, cut off at `repulsion_max_distance`)
//! - centering pull toward the viewport center
//! - collision keyed to each node's rendered radius
//!
//! Strengths scale with `alpha`, which decays toward `alpha_target` every
//! step. The layout is cool once alpha is below `alpha_min` and the kinetic
//! energy is below `energy_threshold`; cool simulations do not step until
//! reheated.
//!
//! # Usage
//! ```ignore
//! let (snapshot, _) = normalize(&payload);
//! let mut sim = ForceSimulation::new(snapshot, global_config().forces.clone());
//!
//! // Each frame:
//! sim.tick();
//! for node in &sim.graph().nodes {
//!     draw_circle(node.position, node.radius());
//! }
//! ```

use egui::{Pos2, Rect, Vec2};

use crate::config::ForceSettings;

use super::types::GraphSnapshot;

/// Golden angle in radians; spiral placement
const GOLDEN_ANGLE: f32 = 2.399_963;

/// Spiral spacing for initial placement
const INITIAL_RADIUS: f32 = 30.0;

/// Substitute separation for coincident nodes
fn jiggle(i: usize, j: usize) -> Vec2 {
    Vec2::angled((i * 31 + j * 17) as f32 * GOLDEN_ANGLE)
}

// =============================================================================
// FORCE SIMULATION
// =============================================================================

#[derive(Debug, Clone)]
pub struct ForceSimulation {
    /// Graph being laid out; positions and velocities live on its nodes
    graph: GraphSnapshot,

    /// (source, target) node indices per edge
    links: Vec<(usize, usize)>,

    /// Link count per node
    degree: Vec<usize>,

    pub config: ForceSettings,

    /// Centering target, normally the viewport center
    pub center: Pos2,

    alpha: f32,
    alpha_target: f32,

    /// Sum of squared speeds after the last step
    energy: f32,

    stabilized: bool,
}

impl ForceSimulation {
    /// Take ownership of a snapshot and place nodes that have no position
    /// on a golden-angle spiral around the origin.
    pub fn new(graph: GraphSnapshot, config: ForceSettings) -> Self {
        Self::new_centered(graph, config, Pos2::ZERO)
    }

    /// As [`ForceSimulation::new`], spiralling out from `center`
    pub fn new_centered(mut graph: GraphSnapshot, config: ForceSettings, center: Pos2) -> Self {
        let links = graph.edge_endpoints();
        let mut degree = vec![0; graph.nodes.len()];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }

        for (i, node) in graph.nodes.iter_mut().enumerate() {
            if node.position == Pos2::ZERO {
                let angle = i as f32 * GOLDEN_ANGLE;
                let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
                node.position = center + Vec2::angled(angle) * radius;
            }
            node.velocity = Vec2::ZERO;
            node.pinned = false;
        }

        Self {
            graph,
            links,
            degree,
            config,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            energy: f32::MAX,
            stabilized: false,
        }
    }

    pub fn graph(&self) -> &GraphSnapshot {
        &self.graph
    }

    // =========================================================================
    // STEPPING
    // =========================================================================

    /// Advance one step. Returns false when cool (nothing moved).
    pub fn tick(&mut self) -> bool {
        if self.stabilized || self.graph.nodes.is_empty() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_repulsion();
        self.apply_centering();
        self.apply_collision();

        let keep = 1.0 - self.config.velocity_decay;
        let max_velocity = self.config.max_velocity;
        let mut energy = 0.0;

        for node in &mut self.graph.nodes {
            if node.pinned {
                node.velocity = Vec2::ZERO;
                continue;
            }

            node.velocity *= keep;

            let speed = node.velocity.length();
            if speed > max_velocity {
                node.velocity = node.velocity / speed * max_velocity;
            }

            node.position += node.velocity;
            energy += node.velocity.length_sq();
        }

        self.energy = energy;
        self.stabilized =
            self.alpha < self.config.alpha_min && energy < self.config.energy_threshold;
        true
    }

    /// Spring toward `link_distance`, using predicted positions. Strength is
    /// divided by the smaller endpoint degree so hubs are not torn apart.
    fn apply_links(&mut self) {
        let alpha = self.alpha;
        let nodes = &mut self.graph.nodes;

        for (k, &(s, t)) in self.links.iter().enumerate() {
            if s == t {
                continue;
            }

            let mut delta = (nodes[t].position + nodes[t].velocity)
                - (nodes[s].position + nodes[s].velocity);
            if delta.length_sq() == 0.0 {
                delta = jiggle(k, s) * 1e-3;
            }
            let len = delta.length();

            let (ds, dt) = (self.degree[s] as f32, self.degree[t] as f32);
            let strength = self.config.link_strength / ds.min(dt);
            let delta = delta * ((len - self.config.link_distance) / len * alpha * strength);

            let bias = ds / (ds + dt);
            nodes[t].velocity -= delta * bias;
            nodes[s].velocity += delta * (1.0 - bias);
        }
    }

    fn apply_repulsion(&mut self) {
        let alpha = self.alpha;
        let max_sq = self.config.repulsion_max_distance * self.config.repulsion_max_distance;
        let min_sq = self.config.min_distance * self.config.min_distance;
        let nodes = &mut self.graph.nodes;
        let n = nodes.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let mut delta = nodes[j].position - nodes[i].position;
                let mut dist_sq = delta.length_sq();
                if dist_sq >= max_sq {
                    continue;
                }
                if dist_sq == 0.0 {
                    delta = jiggle(i, j) * self.config.min_distance;
                    dist_sq = min_sq;
                }
                let dist_sq = dist_sq.max(min_sq);

                let push = delta * (self.config.repulsion * alpha / dist_sq);
                nodes[i].velocity -= push;
                nodes[j].velocity += push;
            }
        }
    }

    fn apply_centering(&mut self) {
        let k = self.config.center_strength * self.alpha;
        for node in &mut self.graph.nodes {
            node.velocity += (self.center - node.position) * k;
        }
    }

    /// Separate overlapping circles; the smaller node gives way more.
    /// Not scaled by alpha.
    fn apply_collision(&mut self) {
        let padding = self.config.collision_padding;
        let strength = self.config.collision_strength;
        let nodes = &mut self.graph.nodes;
        let n = nodes.len();

        for i in 0..n {
            let ri = nodes[i].radius();
            for j in (i + 1)..n {
                let rj = nodes[j].radius();
                let reach = ri + rj + padding;

                let mut delta = (nodes[j].position + nodes[j].velocity)
                    - (nodes[i].position + nodes[i].velocity);
                let mut dist_sq = delta.length_sq();
                if dist_sq >= reach * reach {
                    continue;
                }
                if dist_sq == 0.0 {
                    delta = jiggle(i, j) * 1e-3;
                    dist_sq = delta.length_sq();
                }

                let dist = dist_sq.sqrt();
                let overlap = delta * ((reach - dist) / dist * strength);
                let (wi, wj) = (ri * ri, rj * rj);
                nodes[i].velocity -= overlap * (wj / (wi + wj));
                nodes[j].velocity += overlap * (wi / (wi + wj));
            }
        }
    }

    // =========================================================================
    // COOLING
    // =========================================================================

    /// Raise alpha to at least `alpha` and resume stepping
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
        self.stabilized = false;
    }

    /// Full restart, as on refresh
    pub fn restart(&mut self) {
        self.alpha = 1.0;
        self.alpha_target = 0.0;
        self.stabilized = false;
    }

    pub fn is_stable(&self) -> bool {
        self.stabilized
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    /// Kinetic energy after the last step
    pub fn energy(&self) -> f32 {
        self.energy
    }

    // =========================================================================
    // PINNING (for drag)
    // =========================================================================

    /// Hold a node in place and keep the layout warm while it is held
    pub fn pin(&mut self, id: &str) {
        if let Some(node) = self.graph.get_node_mut(id) {
            node.pinned = true;
            node.velocity = Vec2::ZERO;
            self.alpha_target = self.config.drag_alpha_target;
            self.reheat(self.config.drag_alpha_target);
        }
    }

    /// Release a node back into the layout and let it cool again
    pub fn unpin(&mut self, id: &str) {
        if let Some(node) = self.graph.get_node_mut(id) {
            node.pinned = false;
            self.alpha_target = 0.0;
            self.reheat(self.config.reheat_alpha);
        }
    }

    /// Move a node directly (drag)
    pub fn move_node(&mut self, id: &str, new_pos: Pos2) {
        if let Some(node) = self.graph.get_node_mut(id) {
            node.position = new_pos;
            self.stabilized = false;
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.graph.get_node(id).is_some_and(|n| n.pinned)
    }

    // =========================================================================
    // VIEWPORT
    // =========================================================================

    /// Recenter on a resized viewport and reheat
    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.center = Pos2::new(width / 2.0, height / 2.0);
        self.reheat(self.config.reheat_alpha);
    }

    /// World-space rectangle enclosing every node circle
    pub fn bounds(&self) -> Option<Rect> {
        if self.graph.nodes.is_empty() {
            return None;
        }
        Some(self.graph.nodes.iter().fold(Rect::NOTHING, |rect, node| {
            rect.union(Rect::from_center_size(
                node.position,
                Vec2::splat(node.radius() * 2.0),
            ))
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize::normalize;
    use crate::graph::types::GraphPayload;

    fn sim_from(json: &str) -> ForceSimulation {
        let payload = GraphPayload::from_json_str(json).unwrap();
        let (snapshot, _) = normalize(&payload);
        ForceSimulation::new(snapshot, ForceSettings::default())
    }

    fn pair(linked: bool) -> ForceSimulation {
        let edges = if linked {
            r#"[{"id":"e","source":"a","target":"b","type":"KNOWS"}]"#
        } else {
            "[]"
        };
        sim_from(&format!(
            r#"{{"nodes":[{{"id":"a"}},{{"id":"b"}}],"edges":{}}}"#,
            edges
        ))
    }

    fn distance(sim: &ForceSimulation, a: &str, b: &str) -> f32 {
        let g = sim.graph();
        (g.get_node(a).unwrap().position - g.get_node(b).unwrap().position).length()
    }

    fn run_until_cool(sim: &mut ForceSimulation, max_ticks: usize) -> usize {
        (0..max_ticks).take_while(|_| sim.tick()).count()
    }

    #[test]
    fn initial_placement_is_deterministic() {
        let a = pair(true);
        let b = pair(true);
        let pa: Vec<Pos2> = a.graph().nodes.iter().map(|n| n.position).collect();
        let pb: Vec<Pos2> = b.graph().nodes.iter().map(|n| n.position).collect();
        assert_eq!(pa, pb);
        assert_ne!(pa[0], pa[1]);
    }

    #[test]
    fn repulsion_separates_unlinked_nodes() {
        let mut sim = pair(false);
        let before = distance(&sim, "a", "b");
        for _ in 0..100 {
            sim.tick();
        }
        assert!(distance(&sim, "a", "b") > before);
    }

    #[test]
    fn link_settles_near_rest_length() {
        let mut sim = pair(true);
        run_until_cool(&mut sim, 2000);
        let d = distance(&sim, "a", "b");
        assert!((90.0..160.0).contains(&d), "distance {}", d);
    }

    #[test]
    fn simulation_cools_and_stops() {
        let mut sim = sim_from(
            r#"{"nodes":[{"id":1},{"id":2},{"id":3},{"id":4}],
                "edges":[{"source":1,"target":2},{"source":2,"target":3},{"source":3,"target":4}]}"#,
        );
        let ticks = run_until_cool(&mut sim, 2000);
        assert!(ticks < 2000);
        assert!(sim.is_stable());
        assert!(sim.alpha() < sim.config.alpha_min);
        assert!(!sim.tick());
    }

    #[test]
    fn reheat_resumes_a_cool_layout() {
        let mut sim = pair(true);
        run_until_cool(&mut sim, 2000);
        sim.reheat(0.3);
        assert!(!sim.is_stable());
        assert!(sim.tick());
    }

    #[test]
    fn pinned_node_does_not_move() {
        let mut sim = pair(true);
        sim.pin("a");
        sim.move_node("a", Pos2::new(400.0, 400.0));
        for _ in 0..30 {
            sim.tick();
        }
        assert_eq!(sim.graph().get_node("a").unwrap().position, Pos2::new(400.0, 400.0));
        assert!(sim.alpha() >= sim.config.drag_alpha_target * 0.99);
    }

    #[test]
    fn released_node_moves_again_within_a_few_ticks() {
        let mut sim = pair(true);
        sim.pin("a");
        sim.move_node("a", Pos2::new(400.0, 400.0));
        for _ in 0..10 {
            sim.tick();
        }
        sim.unpin("a");
        assert_eq!(sim.alpha_target(), 0.0);
        for _ in 0..5 {
            sim.tick();
        }
        assert_ne!(sim.graph().get_node("a").unwrap().position, Pos2::new(400.0, 400.0));
    }

    #[test]
    fn coincident_nodes_are_pushed_apart() {
        let mut sim = pair(false);
        sim.move_node("a", Pos2::new(10.0, 10.0));
        sim.move_node("b", Pos2::new(10.0, 10.0));
        for _ in 0..50 {
            sim.tick();
        }
        assert!(distance(&sim, "a", "b") > 1.0);
    }

    #[test]
    fn resize_recenters_and_reheats() {
        let mut sim = pair(true);
        run_until_cool(&mut sim, 2000);
        sim.set_viewport_size(800.0, 600.0);
        assert_eq!(sim.center, Pos2::new(400.0, 300.0));
        assert!(!sim.is_stable());
    }

    #[test]
    fn empty_graph_never_steps() {
        let mut sim = sim_from("{}");
        assert!(!sim.tick());
        assert!(sim.bounds().is_none());
    }
}
