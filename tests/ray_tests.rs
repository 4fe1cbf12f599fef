#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use autodrome::simulation::geometry::Vec2;
use autodrome::simulation::ray::{Ray, cast_fan, fan_angles};
use autodrome::simulation::track::{PieceKind, TrackPiece};

#[test]
fn test_ray_hits_both_walls_of_a_straight() {
    let piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, 0.0);

    // Straight down from the centreline hits the lower wall at 50.
    let down = Ray::new(Vec2::new(150.0, 0.0), Vec2::new(0.0, 1.0));
    let hits = down.hit_distances(std::slice::from_ref(&piece));
    assert!(!hits.is_empty());
    assert!((hits[0] - 50.0).abs() < 1.0);

    let up = Ray::new(Vec2::new(150.0, 0.0), Vec2::new(0.0, -1.0));
    let hits = up.hit_distances(std::slice::from_ref(&piece));
    assert!(!hits.is_empty());
    assert!((hits[0] - 50.0).abs() < 1.0);
}

#[test]
fn test_parallel_ray_never_intersects() {
    let piece = TrackPiece::new(PieceKind::Straight, Vec2::ZERO, 0.0);

    // Along the centreline, parallel to both walls.
    let ray = Ray::new(Vec2::new(150.0, 0.0), Vec2::new(1.0, 0.0));
    assert!(ray.hit_distances(std::slice::from_ref(&piece)).is_empty());
    assert_eq!(ray.nearest_hit(std::slice::from_ref(&piece), 500.0), 500.0);
}

#[test]
fn test_backward_hits_are_discarded() {
    // The end piece closes its right side with a vertical wall at x = 300.
    let piece = TrackPiece::new(PieceKind::End, Vec2::ZERO, 0.0);

    let forward = Ray::new(Vec2::new(150.0, 0.0), Vec2::new(1.0, 0.0));
    let hits = forward.hit_distances(std::slice::from_ref(&piece));
    assert!(!hits.is_empty());
    assert!((hits[0] - 150.0).abs() < 1.0);

    // Pointing away from the wall, the same intersection lies behind.
    let backward = Ray::new(Vec2::new(150.0, 0.0), Vec2::new(-1.0, 0.0));
    assert!(backward.hit_distances(std::slice::from_ref(&piece)).is_empty());
}

#[test]
fn test_hit_distances_are_sorted() {
    let pieces = [
        TrackPiece::new(PieceKind::End, Vec2::ZERO, 0.0),
        TrackPiece::new(PieceKind::End, Vec2::new(300.0, 0.0), 0.0),
    ];

    let ray = Ray::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
    let hits = ray.hit_distances(&pieces);
    assert!(hits.len() >= 2);
    assert!(hits.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_fan_spreads_across_forward_half_circle() {
    let angles = fan_angles(0.0, 3);
    assert_eq!(angles.len(), 3);
    assert!((angles[0] + std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    assert!(angles[1].abs() < 1e-5);
    assert!((angles[2] - std::f32::consts::FRAC_PI_4).abs() < 1e-5);
}

#[test]
fn test_fan_clamps_to_max_range_on_empty_track() {
    let readings = cast_fan(Vec2::ZERO, 0.0, 3, 500.0, &[]);
    assert_eq!(readings, vec![500.0, 500.0, 500.0]);
}

#[test]
fn test_fan_centre_ray_reads_wall_distance() {
    let piece = TrackPiece::new(PieceKind::End, Vec2::ZERO, 0.0);
    let readings = cast_fan(
        Vec2::new(100.0, 0.0),
        0.0,
        3,
        500.0,
        std::slice::from_ref(&piece),
    );
    // Heading zero points at the closing wall 200 units ahead.
    assert!((readings[1] - 200.0).abs() < 1.0);
}
