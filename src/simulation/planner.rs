//! A* path planning over a sampled grid, plus Bezier smoothing.
//!
//! The planner rasterises the track surface into a point grid, connects
//! neighbouring grid points through a KD-tree, runs A* from the spawn point
//! to the end piece, and smooths the resulting node chain into a chain of
//! cubic Bezier segments that vehicles steer along.

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use tracing::info;

use super::error::SimError;
use super::geometry::Vec2;
use super::track::Track;

/// Spacing between sampled grid points, in world units.
pub const GRID_PITCH: f32 = 10.0;

/// Grid points within this multiple of the pitch count as neighbours;
/// covers the diagonal at `sqrt(2)` with a little slack.
const NEIGHBOUR_REACH: f32 = 1.45;

/// Path nodes are thinned to every this-many nodes before smoothing.
const CONTROL_POINT_STRIDE: usize = 4;

/// Sample resolution when projecting a position onto the smoothed path.
const CLOSEST_POINT_STEPS: usize = 10;

/// 2D KD-tree mapping sampled positions to node indices.
type Tree2D = KdTree<f32, usize, Vec<f32>>;

/// One sampled grid point with its A* bookkeeping.
#[derive(Debug, Clone)]
struct PathNode {
    pos: Vec2,
    /// Cost of the cheapest known route from the seed.
    g: f32,
    /// Straight-line estimate to the goal.
    h: f32,
    f: f32,
    visited: bool,
    in_open: bool,
    /// Index of the node this one was reached from.
    prev: Option<usize>,
}

impl PathNode {
    fn new(pos: Vec2, goal: Vec2) -> Self {
        Self {
            pos,
            g: f32::INFINITY,
            h: pos.distance(goal),
            f: f32::INFINITY,
            visited: false,
            in_open: false,
            prev: None,
        }
    }
}

/// A planned and smoothed route from a spawn point to the track's end.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    path: Vec<Vec2>,
    control_points: Vec<Vec2>,
}

impl PathPlanner {
    /// Plans a route across `track` starting from `spawn`.
    ///
    /// Fails with [`SimError::NoPath`] when the sampled grid holds no
    /// connected route from the spawn to the end piece.
    pub fn new(track: &Track, spawn: Vec2) -> Result<Self, SimError> {
        let goal = track.end_piece().centre();
        let mut nodes = sample_grid(track, spawn, goal);
        let tree = build_tree(&nodes)?;

        info!(nodes = nodes.len(), "sampled planning grid");

        let path = search(&mut nodes, &tree, goal)?;
        let control_points = thin_to_control_points(&path);

        info!(
            path_nodes = path.len(),
            control_points = control_points.len(),
            "planned path"
        );

        Ok(Self {
            path,
            control_points,
        })
    }

    /// The raw A* node chain, ordered spawn to goal.
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    /// The thinned Bezier control points.
    pub fn control_points(&self) -> &[Vec2] {
        &self.control_points
    }

    /// Number of cubic Bezier segments in the smoothed path.
    pub fn segment_count(&self) -> usize {
        self.control_points.len().saturating_sub(1) / 3
    }

    /// Point on the smoothed path at parameter `t`.
    ///
    /// The integer part of `t` selects the Bezier segment and the
    /// fractional part moves along it; parameters past the final segment
    /// clamp to the last control point.
    pub fn point_along_path(&self, t: f32) -> Vec2 {
        let segment = t.max(0.0).floor() as usize;
        let base = 3 * segment;
        if base + 3 >= self.control_points.len() {
            return self.control_points[self.control_points.len() - 1];
        }
        cubic_bezier(
            self.control_points[base],
            self.control_points[base + 1],
            self.control_points[base + 2],
            self.control_points[base + 3],
            t - segment as f32,
        )
    }

    /// Point on the smoothed path nearest to `pos`, at the sample
    /// resolution.
    pub fn closest_point(&self, pos: Vec2) -> Vec2 {
        self.point_along_path(self.closest_parameter(pos))
    }

    /// Path parameter of the sampled point nearest to `pos`.
    pub fn closest_parameter(&self, pos: Vec2) -> f32 {
        let steps = self.segment_count() * CLOSEST_POINT_STEPS;
        let mut best_t = 0.0;
        let mut best_dist = f32::INFINITY;
        for i in 0..=steps {
            let t = i as f32 / CLOSEST_POINT_STEPS as f32;
            let dist = self.point_along_path(t).distance(pos);
            if dist < best_dist {
                best_dist = dist;
                best_t = t;
            }
        }
        best_t
    }
}

/// Evaluates a cubic Bezier curve at `t` in `[0, 1]`.
pub fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Samples the track surface into grid nodes, seeding the spawn point as
/// node zero.
fn sample_grid(track: &Track, spawn: Vec2, goal: Vec2) -> Vec<PathNode> {
    let mut nodes = vec![PathNode::new(spawn, goal)];

    for piece in track.pieces() {
        // Axis-aligned bounds of the rotated piece in world space.
        let mut lo = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut hi = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for side in piece.sides() {
            for v in side {
                let p = *v + piece.pos();
                lo = Vec2::new(lo.x.min(p.x), lo.y.min(p.y));
                hi = Vec2::new(hi.x.max(p.x), hi.y.max(p.y));
            }
        }

        let cols = ((hi.x - lo.x) / GRID_PITCH) as usize;
        let rows = ((hi.y - lo.y) / GRID_PITCH) as usize;
        for col in 0..=cols {
            for row in 0..=rows {
                let point = lo + GRID_PITCH * Vec2::new(col as f32, row as f32);
                if piece.collision_point(point) {
                    nodes.push(PathNode::new(point, goal));
                }
            }
        }
    }

    nodes
}

fn build_tree(nodes: &[PathNode]) -> Result<Tree2D, SimError> {
    let mut tree = KdTree::with_capacity(2, nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        tree.add(vec![node.pos.x, node.pos.y], i)
            .map_err(|_| SimError::NoPath)?;
    }
    Ok(tree)
}

/// Closed-set A* over the sampled grid.
///
/// The open set is a plain index vector scanned for the minimum `f`; grid
/// sizes here are a few thousand nodes, so the scan stays cheap. Returns
/// the node chain ordered spawn to goal.
fn search(nodes: &mut [PathNode], tree: &Tree2D, goal: Vec2) -> Result<Vec<Vec2>, SimError> {
    nodes[0].g = 0.0;
    nodes[0].f = nodes[0].h;
    nodes[0].in_open = true;
    let mut open = vec![0_usize];

    let reach_sq = (NEIGHBOUR_REACH * GRID_PITCH).powi(2);

    while !open.is_empty() {
        let mut best = 0;
        for (i, &node) in open.iter().enumerate() {
            if nodes[node].f < nodes[open[best]].f {
                best = i;
            }
        }
        let current = open.swap_remove(best);
        nodes[current].in_open = false;
        nodes[current].visited = true;

        if nodes[current].pos.distance(goal) <= GRID_PITCH {
            return Ok(retrace(nodes, current));
        }

        let here = nodes[current].pos;
        let neighbours = tree
            .within(&[here.x, here.y], reach_sq, &squared_euclidean)
            .unwrap_or_default();

        for (_, &neighbour) in neighbours {
            if neighbour == current || nodes[neighbour].visited {
                continue;
            }
            let tentative_g = nodes[current].g + here.distance(nodes[neighbour].pos);
            if tentative_g < nodes[neighbour].g {
                let node = &mut nodes[neighbour];
                node.g = tentative_g;
                node.f = tentative_g + node.h;
                node.prev = Some(current);
                if !node.in_open {
                    node.in_open = true;
                    open.push(neighbour);
                }
            }
        }
    }

    Err(SimError::NoPath)
}

/// Walks the `prev` chain back from the goal node and reverses it.
fn retrace(nodes: &[PathNode], goal_index: usize) -> Vec<Vec2> {
    let mut path = Vec::new();
    let mut current = Some(goal_index);
    while let Some(i) = current {
        path.push(nodes[i].pos);
        current = nodes[i].prev;
    }
    path.reverse();
    path
}

/// Thins the node chain to every fourth node, then trims the tail so the
/// count splits exactly into cubic segments (one shared endpoint between
/// neighbouring segments).
fn thin_to_control_points(path: &[Vec2]) -> Vec<Vec2> {
    let mut points: Vec<Vec2> = path.iter().copied().step_by(CONTROL_POINT_STRIDE).collect();
    while points.len() > 1 && points.len() % 3 != 1 {
        points.pop();
    }
    points
}
