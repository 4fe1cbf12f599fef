//! Track pieces, collision tests, and track assembly.
//!
//! A track is an ordered chain of fixed-geometry pieces. Each piece stores
//! its edge polylines ("sides") in local space, rotated to the piece's
//! heading; the unrotated originals are kept so re-orienting a piece never
//! accumulates error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::error::SimError;
use super::geometry::Vec2;

/// Nominal length of a straight piece and radius of the outer curve arc.
pub const PIECE_LENGTH: f32 = 300.0;
/// Drivable width of the track surface.
pub const TRACK_WIDTH: f32 = 100.0;

/// The fixed shapes a track can be assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PieceKind {
    /// Straight two-edge segment.
    Straight,
    /// Quarter turn bending left.
    CurveLeft,
    /// Quarter turn bending right.
    CurveRight,
    /// Track entry marker; closed on its left end.
    Start,
    /// Track exit marker; closed on its right end.
    End,
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::Straight => "straight",
            PieceKind::CurveLeft => "curve-left",
            PieceKind::CurveRight => "curve-right",
            PieceKind::Start => "start",
            PieceKind::End => "end",
        };
        write!(f, "{name}")
    }
}

/// The persistence form of a track piece: origin, heading, and kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceBlueprint {
    /// World-space origin of the piece.
    pub pos: Vec2,
    /// Heading in radians.
    pub heading: f32,
    /// Piece shape.
    pub kind: PieceKind,
}

/// A single track piece with heading-rotated geometry.
#[derive(Debug, Clone)]
pub struct TrackPiece {
    kind: PieceKind,
    pos: Vec2,
    heading: f32,
    size: Vec2,
    sides: Vec<Vec<Vec2>>,
    orig_sides: Vec<Vec<Vec2>>,
    end_offset: Vec2,
    orig_end_offset: Vec2,
    top_left: Vec2,
    bottom_right: Vec2,
    bottom_left: Vec2,
    orig_top_left: Vec2,
    orig_bottom_right: Vec2,
    orig_bottom_left: Vec2,
}

impl TrackPiece {
    /// Creates a piece of the given kind at a world position with a heading.
    pub fn new(kind: PieceKind, pos: Vec2, heading: f32) -> Self {
        let (sides, end_offset, top_left, bottom_right) = local_geometry(kind);
        let bottom_left = Vec2::new(top_left.x, bottom_right.y);

        let mut piece = Self {
            kind,
            pos,
            heading: 0.0,
            size: match kind {
                PieceKind::CurveLeft | PieceKind::CurveRight => {
                    Vec2::new(PIECE_LENGTH, PIECE_LENGTH)
                }
                _ => Vec2::new(PIECE_LENGTH, TRACK_WIDTH),
            },
            sides: sides.clone(),
            orig_sides: sides,
            end_offset,
            orig_end_offset: end_offset,
            top_left,
            bottom_right,
            bottom_left,
            orig_top_left: top_left,
            orig_bottom_right: bottom_right,
            orig_bottom_left: bottom_left,
        };
        piece.set_heading(heading);
        piece
    }

    /// Re-orients the piece.
    ///
    /// Rotation always restarts from the unrotated original geometry, so
    /// repeated calls do not compound.
    pub fn set_heading(&mut self, heading: f32) {
        self.heading = heading;
        let (sin, cos) = heading.sin_cos();
        let col1 = Vec2::new(cos, sin);
        let col2 = Vec2::new(-sin, cos);

        self.sides = self
            .orig_sides
            .iter()
            .map(|side| side.iter().map(|v| v.transform(col1, col2)).collect())
            .collect();

        self.end_offset = self.orig_end_offset.transform(col1, col2);
        self.top_left = self.orig_top_left.transform(col1, col2);
        self.bottom_right = self.orig_bottom_right.transform(col1, col2);
        self.bottom_left = self.orig_bottom_left.transform(col1, col2);
    }

    /// Piece shape tag.
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// World-space origin (the entry point on the centreline).
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    /// Heading in radians.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Local, unrotated extent of the piece.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Heading-rotated edge polylines in piece-local space.
    pub fn sides(&self) -> &[Vec<Vec2>] {
        &self.sides
    }

    /// World-space point where the next piece chains on.
    pub fn end_pos(&self) -> Vec2 {
        self.pos + self.end_offset
    }

    /// Heading the next chained piece should take.
    pub fn exit_heading(&self) -> f32 {
        match self.kind {
            PieceKind::CurveRight => self.heading + std::f32::consts::FRAC_PI_2,
            PieceKind::CurveLeft => self.heading - std::f32::consts::FRAC_PI_2,
            _ => self.heading,
        }
    }

    /// World-space drawable centre: the mean of all side vertices.
    pub fn centre(&self) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;
        for side in &self.sides {
            for v in side {
                sum += *v;
                count += 1;
            }
        }
        self.pos + (1.0 / count as f32) * sum
    }

    /// Tests whether a world-space point lies on the drivable surface.
    ///
    /// The box test is normalized by the sign of `bottom_right - top_left`
    /// so the inequalities stay correct after rotation flips a corner past
    /// the other. Curved pieces additionally confine the point to the
    /// annulus between the inner and outer arc radii.
    pub fn collision_point(&self, point: Vec2) -> bool {
        let tb = (self.bottom_right - self.top_left).sign();
        let top_left = self.top_left + self.pos - tb;
        let bottom_right = self.bottom_right + self.pos - tb;

        let in_x = top_left.x * tb.x <= point.x * tb.x && point.x * tb.x <= bottom_right.x * tb.x;
        let in_y = top_left.y * tb.y <= point.y * tb.y && point.y * tb.y <= bottom_right.y * tb.y;

        match self.kind {
            PieceKind::CurveLeft | PieceKind::CurveRight => {
                // The drivable band of a curve is radial, centred on the
                // arc origin at the rotated bottom-left corner.
                let arc_origin = self.bottom_left + self.pos;
                let dist = point.distance(arc_origin);
                in_x && (self.size.x - TRACK_WIDTH..=self.size.x).contains(&dist)
            }
            _ => in_x && in_y,
        }
    }

    /// Coarse membership test used for crossing/error scoring: within half
    /// the piece's diagonal of its drawable centre.
    pub fn crossed(&self, point: Vec2) -> bool {
        point.distance(self.centre()) <= self.size.magnitude() / 2.0
    }

    /// Snapshot of the piece in persistence form.
    pub fn blueprint(&self) -> PieceBlueprint {
        PieceBlueprint {
            pos: self.pos,
            heading: self.heading,
            kind: self.kind,
        }
    }
}

/// Unrotated sides, end offset, and bounding corners for a piece kind.
fn local_geometry(kind: PieceKind) -> (Vec<Vec<Vec2>>, Vec2, Vec2, Vec2) {
    let half = TRACK_WIDTH / 2.0;
    match kind {
        PieceKind::Straight => (
            vec![
                vec![Vec2::new(0.0, half), Vec2::new(PIECE_LENGTH, half)],
                vec![Vec2::new(0.0, -half), Vec2::new(PIECE_LENGTH, -half)],
            ],
            Vec2::new(PIECE_LENGTH, 0.0),
            Vec2::new(0.0, -half),
            Vec2::new(PIECE_LENGTH, half),
        ),
        PieceKind::Start => (
            // One polyline closing the entry end.
            vec![vec![
                Vec2::new(PIECE_LENGTH, half),
                Vec2::new(0.0, half),
                Vec2::new(0.0, -half),
                Vec2::new(PIECE_LENGTH, -half),
            ]],
            Vec2::new(PIECE_LENGTH, 0.0),
            Vec2::new(0.0, -half),
            Vec2::new(PIECE_LENGTH, half),
        ),
        PieceKind::End => (
            // One polyline closing the exit end.
            vec![vec![
                Vec2::new(0.0, half),
                Vec2::new(PIECE_LENGTH, half),
                Vec2::new(PIECE_LENGTH, -half),
                Vec2::new(0.0, -half),
            ]],
            Vec2::new(PIECE_LENGTH, 0.0),
            Vec2::new(0.0, -half),
            Vec2::new(PIECE_LENGTH, half),
        ),
        PieceKind::CurveRight => curve_right_geometry(),
        PieceKind::CurveLeft => {
            let (sides, end, tl, br) = curve_right_geometry();
            let flip = |v: Vec2| v.transform(Vec2::new(1.0, 0.0), Vec2::new(0.0, -1.0));
            (
                sides
                    .iter()
                    .map(|side| side.iter().map(|v| flip(*v)).collect())
                    .collect(),
                flip(end),
                flip(tl),
                flip(br),
            )
        }
    }
}

fn curve_right_geometry() -> (Vec<Vec<Vec2>>, Vec2, Vec2, Vec2) {
    let w = PIECE_LENGTH / 18.0;
    let h = PIECE_LENGTH / 18.0;
    let outer = vec![
        Vec2::new(0.0, -3.0 * h),
        Vec2::new(5.0 * w, -2.0 * h),
        Vec2::new(8.0 * w, -h),
        Vec2::new(11.0 * w, h),
        Vec2::new(14.0 * w, 4.0 * h),
        Vec2::new(16.0 * w, 7.0 * h),
        Vec2::new(17.0 * w, 10.0 * h),
        Vec2::new(18.0 * w, 15.0 * h),
    ];
    let inner = vec![
        Vec2::new(0.0, 3.0 * h),
        Vec2::new(4.0 * w, 4.0 * h),
        Vec2::new(7.0 * w, 6.0 * h),
        Vec2::new(9.0 * w, 8.0 * h),
        Vec2::new(11.0 * w, 11.0 * h),
        Vec2::new(12.0 * w, 15.0 * h),
    ];
    (
        vec![outer, inner],
        Vec2::new(15.0 * w, 15.0 * h),
        Vec2::new(0.0, -3.0 * h),
        Vec2::new(18.0 * w, 15.0 * h),
    )
}

/// An ordered, validated chain of track pieces.
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    pieces: Vec<TrackPiece>,
    start_index: usize,
    end_index: usize,
}

/// On-disk form of a track.
#[derive(Debug, Serialize, Deserialize)]
struct TrackFile {
    name: String,
    pieces: Vec<PieceBlueprint>,
}

impl Track {
    /// Reconstructs a track from its persistence form.
    ///
    /// Fails unless the structure contains exactly one start and exactly
    /// one end piece.
    pub fn from_blueprints(
        name: impl Into<String>,
        blueprints: &[PieceBlueprint],
    ) -> Result<Self, SimError> {
        let pieces: Vec<TrackPiece> = blueprints
            .iter()
            .map(|b| TrackPiece::new(b.kind, b.pos, b.heading))
            .collect();

        let mut start_index = None;
        let mut end_index = None;
        for (i, piece) in pieces.iter().enumerate() {
            match piece.kind() {
                PieceKind::Start => {
                    if start_index.replace(i).is_some() {
                        return Err(SimError::DuplicateStartPiece);
                    }
                }
                PieceKind::End => {
                    if end_index.replace(i).is_some() {
                        return Err(SimError::DuplicateEndPiece);
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            name: name.into(),
            pieces,
            start_index: start_index.ok_or(SimError::MissingStartPiece)?,
            end_index: end_index.ok_or(SimError::MissingEndPiece)?,
        })
    }

    /// Track name used in result records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All pieces in chain order.
    pub fn pieces(&self) -> &[TrackPiece] {
        &self.pieces
    }

    /// The unique start piece.
    pub fn start_piece(&self) -> &TrackPiece {
        &self.pieces[self.start_index]
    }

    /// The unique end piece.
    pub fn end_piece(&self) -> &TrackPiece {
        &self.pieces[self.end_index]
    }

    /// Whether the point lies on any piece's drivable surface.
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.pieces.iter().any(|p| p.collision_point(point))
    }

    /// Snapshot of the track in persistence form.
    pub fn blueprints(&self) -> Vec<PieceBlueprint> {
        self.pieces.iter().map(TrackPiece::blueprint).collect()
    }

    /// Saves the track structure to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let file = TrackFile {
            name: self.name.clone(),
            pieces: self.blueprints(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a track structure from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        let file: TrackFile = serde_json::from_str(&json)?;
        Self::from_blueprints(file.name, &file.pieces)
    }
}

/// Builds a track by chaining pieces end-to-start.
///
/// Every builder begins with a start piece at the origin; each appended
/// piece takes the previous piece's end point as its origin and carries the
/// exit heading (curves turn the heading a quarter circle).
#[derive(Debug)]
pub struct TrackBuilder {
    blueprints: Vec<PieceBlueprint>,
    last: TrackPiece,
}

impl Default for TrackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackBuilder {
    /// Starts a new track with a start piece at the origin, heading 0.
    pub fn new() -> Self {
        let start = TrackPiece::new(PieceKind::Start, Vec2::ZERO, 0.0);
        Self {
            blueprints: vec![start.blueprint()],
            last: start,
        }
    }

    /// Chains a piece onto the end of the track.
    pub fn extend(mut self, kind: PieceKind) -> Self {
        let piece = TrackPiece::new(kind, self.last.end_pos(), self.last.exit_heading());
        self.blueprints.push(piece.blueprint());
        self.last = piece;
        self
    }

    /// Validates and produces the finished track.
    pub fn finish(self, name: impl Into<String>) -> Result<Track, SimError> {
        Track::from_blueprints(name, &self.blueprints)
    }
}
