//! Spatial index over node circles
//!
//! R-tree (via `rstar`) in world coordinates. Rebuilt from the layout every
//! frame the simulation moves; answers pointer hit tests and viewport
//! culling without scanning every node.

use egui::{Pos2, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::types::GraphSnapshot;

/// One node circle in the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNode {
    /// Position in `GraphSnapshot::nodes`
    pub index: usize,
    pub center: [f32; 2],
    pub radius: f32,
}

impl IndexedNode {
    pub fn new(index: usize, center: Pos2, radius: f32) -> Self {
        Self {
            index,
            center: [center.x, center.y],
            radius,
        }
    }

    /// Distance from `point` to the circle's rim, zero inside
    fn rim_distance(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        ((dx * dx + dy * dy).sqrt() - self.radius).max(0.0)
    }
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.center[0] - self.radius, self.center[1] - self.radius],
            [self.center[0] + self.radius, self.center[1] + self.radius],
        )
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let d = self.rim_distance(*point);
        d * d
    }

    fn contains_point(&self, point: &[f32; 2]) -> bool {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

#[derive(Clone, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedNode>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("count", &self.tree.size())
            .finish_non_exhaustive()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index at each node's base radius
    pub fn from_graph(graph: &GraphSnapshot) -> Self {
        let mut index = Self::new();
        index.rebuild(graph, |i| graph.nodes[i].radius());
        index
    }

    /// Reload every node circle from current layout positions.
    /// `radius_of` gives the drawn radius, so emphasized nodes hit at their rim.
    pub fn rebuild(&mut self, graph: &GraphSnapshot, radius_of: impl Fn(usize) -> f32) {
        let entries = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| IndexedNode::new(i, n.position, radius_of(i)))
            .collect();
        self.tree = RTree::bulk_load(entries);
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Node under `point`, or within `tolerance` world units of its rim.
    /// The closest rim wins when circles overlap.
    pub fn hit_test(&self, point: Pos2, tolerance: f32) -> Option<usize> {
        let p = [point.x, point.y];
        let search = AABB::from_corners(
            [p[0] - tolerance, p[1] - tolerance],
            [p[0] + tolerance, p[1] + tolerance],
        );

        self.tree
            .locate_in_envelope_intersecting(&search)
            .map(|n| (n.rim_distance(p), n))
            .filter(|(d, _)| *d <= tolerance)
            .min_by(|(da, a), (db, b)| {
                da.partial_cmp(db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Later nodes draw on top
                    .then(b.index.cmp(&a.index))
            })
            .map(|(_, n)| n.index)
    }

    /// Nodes whose circles intersect `rect` (viewport culling), sorted
    pub fn query_rect(&self, rect: Rect) -> Vec<usize> {
        let bounds = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&bounds)
            .map(|n| n.index)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn nearest(&self, point: Pos2) -> Option<usize> {
        self.tree.nearest_neighbor(&[point.x, point.y]).map(|n| n.index)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================
