#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use autodrome::simulation::error::SimError;
use autodrome::simulation::geometry::Vec2;
use autodrome::simulation::track::{
    PIECE_LENGTH, PieceBlueprint, PieceKind, Track, TrackBuilder, TrackPiece,
};
use std::fs;

fn straight_track() -> Track {
    TrackBuilder::new()
        .extend(PieceKind::Straight)
        .extend(PieceKind::End)
        .finish("straight")
        .expect("valid track")
}

#[test]
fn test_builder_chains_pieces() {
    let track = straight_track();

    assert_eq!(track.pieces().len(), 3);
    assert_eq!(track.start_piece().kind(), PieceKind::Start);
    assert_eq!(track.end_piece().kind(), PieceKind::End);

    // Each piece starts where the previous one ends.
    let positions: Vec<Vec2> = track.pieces().iter().map(|p| p.pos()).collect();
    assert!((positions[1].x - PIECE_LENGTH).abs() < 1e-3);
    assert!(positions[1].y.abs() < 1e-3);
    assert!((positions[2].x - 2.0 * PIECE_LENGTH).abs() < 1e-3);
}

#[test]
fn test_curves_turn_the_heading() {
    let track = TrackBuilder::new()
        .extend(PieceKind::CurveRight)
        .extend(PieceKind::Straight)
        .extend(PieceKind::End)
        .finish("bent")
        .expect("valid track");

    // After a right curve the straight runs at a quarter turn.
    let straight = &track.pieces()[2];
    assert!((straight.heading() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
}

#[test]
fn test_track_needs_an_end_piece() {
    let err = TrackBuilder::new().finish("no-end").unwrap_err();
    assert!(matches!(err, SimError::MissingEndPiece));
}

#[test]
fn test_track_rejects_duplicate_start() {
    let blueprints = [
        PieceBlueprint {
            pos: Vec2::ZERO,
            heading: 0.0,
            kind: PieceKind::Start,
        },
        PieceBlueprint {
            pos: Vec2::new(PIECE_LENGTH, 0.0),
            heading: 0.0,
            kind: PieceKind::Start,
        },
        PieceBlueprint {
            pos: Vec2::new(2.0 * PIECE_LENGTH, 0.0),
            heading: 0.0,
            kind: PieceKind::End,
        },
    ];
    let err = Track::from_blueprints("twice", &blueprints).unwrap_err();
    assert!(matches!(err, SimError::DuplicateStartPiece));
}

#[test]
fn test_straight_collision_box() {
    let piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, 0.0);

    assert!(piece.collision_point(Vec2::new(150.0, 0.0)));
    assert!(piece.collision_point(Vec2::new(150.0, 49.0)));
    assert!(!piece.collision_point(Vec2::new(150.0, 60.0)));
    assert!(!piece.collision_point(Vec2::new(-10.0, 0.0)));
}

#[test]
fn test_collision_survives_rotation() {
    // A point on the centreline stays inside under any heading.
    for heading in [0.3_f32, 1.2, std::f32::consts::FRAC_PI_2, 2.9] {
        let piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, heading);
        let mid = Vec2::new(150.0, 0.0).rotated(heading);
        assert!(
            piece.collision_point(mid),
            "midpoint left the piece at heading {heading}"
        );
    }
}

#[test]
fn test_curve_annulus_excludes_inner_corner() {
    let piece = TrackPiece::new(PieceKind::CurveRight, Vec2::ZERO, 0.0);

    // Just inside the entry, on the drivable band.
    assert!(piece.collision_point(Vec2::new(5.0, 0.0)));
    // The arc origin itself is far inside the inner radius.
    assert!(!piece.collision_point(Vec2::new(5.0, 250.0)));
}

#[test]
fn test_crossed_uses_piece_centre() {
    let piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, 0.0);
    let centre = piece.centre();
    let half_diagonal = piece.size().magnitude() / 2.0;

    assert!(piece.crossed(centre));
    assert!(piece.crossed(centre + Vec2::new(half_diagonal - 1.0, 0.0)));
    assert!(!piece.crossed(centre + Vec2::new(half_diagonal + 1.0, 0.0)));
}

#[test]
fn test_save_and_load_round_trip() {
    let track = TrackBuilder::new()
        .extend(PieceKind::Straight)
        .extend(PieceKind::CurveLeft)
        .extend(PieceKind::End)
        .finish("round-trip")
        .expect("valid track");

    let save_path = "test_track_round_trip.json";
    track.save_to_file(save_path).expect("save track");
    let loaded = Track::load_from_file(save_path).expect("load track");

    assert_eq!(loaded.name(), track.name());
    assert_eq!(loaded.blueprints(), track.blueprints());

    fs::remove_file(save_path).ok();
}

#[test]
fn test_reorienting_does_not_accumulate() {
    let mut piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, 0.0);
    let original = piece.end_pos();

    piece.set_heading(1.0);
    piece.set_heading(2.2);
    piece.set_heading(0.0);

    assert!((piece.end_pos().x - original.x).abs() < 1e-4);
    assert!((piece.end_pos().y - original.y).abs() < 1e-4);
}
