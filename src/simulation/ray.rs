//! Ray sensor for measuring distance to track edges.
//!
//! A ray is an origin and a unit direction. Intersections are solved
//! against every edge segment of every piece by the determinant form of
//! the 2x2 linear system; parallel segments simply never intersect.

use super::geometry::Vec2;
use super::track::TrackPiece;

/// Components this close to zero are snapped to exactly zero so
/// axis-aligned rays and segments behave exactly on their axis.
const AXIS_SNAP: f32 = 0.01;

/// Tolerance for intersections at segment endpoints where the
/// half-extent test degenerates on one axis.
const ENDPOINT_TOLERANCE: f32 = 1.5;

/// Hits closer than this to the cast origin are ignored; a sensor flush
/// against a wall reads the far side rather than zero.
const ORIGIN_EPSILON: f32 = 1e-3;

/// A ray cast from an origin in a direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Cast origin.
    pub origin: Vec2,
    /// Travel direction.
    pub dir: Vec2,
}

impl Ray {
    /// Creates a ray from an origin and a direction vector.
    pub fn new(origin: Vec2, dir: Vec2) -> Self {
        Self {
            origin,
            dir: dir.normalized(),
        }
    }

    /// Creates a ray from an origin and an angle in radians.
    pub fn from_angle(origin: Vec2, angle: f32) -> Self {
        let mut dir = Vec2::new(angle.cos(), angle.sin());
        if dir.x.abs() <= AXIS_SNAP {
            dir.x = 0.0;
        }
        if dir.y.abs() <= AXIS_SNAP {
            dir.y = 0.0;
        }
        Self { origin, dir }
    }

    /// Solves for the intersection of this ray's line with the line
    /// through `seg_pos` along `seg_dir`.
    ///
    /// Returns `None` for parallel lines (zero determinant).
    fn intersect(&self, seg_pos: Vec2, seg_dir: Vec2) -> Option<Vec2> {
        let denom = self.dir.cross(seg_dir);
        if denom == 0.0 {
            return None;
        }
        let lambda = (seg_pos.cross(self.dir) + self.dir.cross(self.origin)) / denom;
        Some(seg_pos + lambda * seg_dir)
    }

    /// Whether `point` lies in the ray's forward half-plane.
    ///
    /// Compares the sign pattern of the offset from the origin against the
    /// direction; axes where the direction is exactly zero carry no
    /// information and are skipped.
    fn is_forward(&self, point: Vec2) -> bool {
        let offset = point - self.origin;
        let ahead_x = self.dir.x == 0.0 || self.dir.x * offset.x >= 0.0;
        let ahead_y = self.dir.y == 0.0 || self.dir.y * offset.y >= 0.0;
        ahead_x && ahead_y
    }

    /// Returns every valid intersection of this ray with one piece's edges.
    pub fn piece_intersections(&self, piece: &TrackPiece) -> Vec<Vec2> {
        let mut points = Vec::new();

        for side in piece.sides() {
            for pair in side.windows(2) {
                let seg_pos = pair[0] + piece.pos();
                let mut seg_dir = pair[1] - pair[0];
                if seg_dir.x.abs() < AXIS_SNAP {
                    seg_dir.x = 0.0;
                }
                if seg_dir.y.abs() < AXIS_SNAP {
                    seg_dir.y = 0.0;
                }

                let Some(hit) = self.intersect(seg_pos, seg_dir) else {
                    continue;
                };

                // On-segment test: the hit must lie within half the
                // segment's extent of its midpoint on both axes. The
                // endpoint tolerance covers segments degenerate on an axis.
                let mid = seg_pos + 0.5 * seg_dir;
                let on_segment = (hit.x - mid.x).abs() <= (0.5 * seg_dir.x).abs()
                    && (hit.y - mid.y).abs() <= (0.5 * seg_dir.y).abs();
                let at_endpoint = hit.distance(seg_pos) < ENDPOINT_TOLERANCE;

                if (on_segment || at_endpoint)
                    && self.is_forward(hit)
                    && hit.distance(self.origin) > ORIGIN_EPSILON
                {
                    points.push(hit);
                }
            }
        }

        points
    }

    /// Distances from the origin to every intersection across all pieces,
    /// sorted nearest first.
    pub fn hit_distances(&self, pieces: &[TrackPiece]) -> Vec<f32> {
        let mut distances: Vec<f32> = pieces
            .iter()
            .flat_map(|piece| self.piece_intersections(piece))
            .map(|hit| hit.distance(self.origin))
            .collect();
        distances.sort_by(f32::total_cmp);
        distances
    }

    /// Distance to the nearest edge, clamped to `max_range` when nothing
    /// is hit closer.
    pub fn nearest_hit(&self, pieces: &[TrackPiece], max_range: f32) -> f32 {
        self.hit_distances(pieces)
            .first()
            .map_or(max_range, |d| d.min(max_range))
    }
}

/// Angles for a fan of `count` rays spread across the forward half-circle
/// of a vehicle at `heading`.
///
/// Ray `i` points at `(i + 1) * pi / (count + 1) - heading - pi / 2`; for
/// three rays this is 45 degrees left, dead ahead, 45 degrees right.
pub fn fan_angles(heading: f32, count: usize) -> Vec<f32> {
    let step = std::f32::consts::PI / (count as f32 + 1.0);
    (0..count)
        .map(|i| (i as f32 + 1.0) * step - heading - std::f32::consts::FRAC_PI_2)
        .collect()
}

/// Casts a fan of rays and returns the nearest hit distance per ray,
/// clamped to `max_range`.
pub fn cast_fan(
    origin: Vec2,
    heading: f32,
    count: usize,
    max_range: f32,
    pieces: &[TrackPiece],
) -> Vec<f32> {
    fan_angles(heading, count)
        .into_iter()
        .map(|angle| Ray::from_angle(origin, angle).nearest_hit(pieces, max_range))
        .collect()
}
