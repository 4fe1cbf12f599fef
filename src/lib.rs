//! # Autodrome - Autonomous Vehicle Track Simulation
//!
//! Simulates autonomous vehicles traversing a procedurally-assembled 2D track
//! under three control strategies: an A* path follower, a reactive ray-sensor
//! wanderer, and a genetic-algorithm population steering via small
//! feed-forward networks evolved online.
//!
//! ## Features
//!
//! - Track assembly from straight, curved, start, and end pieces
//! - Oriented bounding-box and annulus collision tests
//! - Ray casting against track edge polylines
//! - Grid-sampled A* planning smoothed into a cubic Bézier spline
//! - Neural network brains evolved by ranked selection and mutation
//! - Append-only results sink and JSON track/network persistence
//!
//! ## Core Modules
//!
//! - [`simulation::track`] - Track pieces, collision tests, chaining
//! - [`simulation::ray`] - Ray sensor and segment intersection
//! - [`simulation::planner`] - A* path planning and spline smoothing
//! - [`simulation::vehicle`] - Vehicle physics and steering policies
//! - [`simulation::population`] - Population lifecycle and evolution
//! - [`simulation::sim`] - Simulation orchestration

/// Core simulation logic and data structures.
pub mod simulation {
    /// Feed-forward neural network used by genetic-algorithm vehicles.
    pub mod brain;
    /// Error types shared across the simulation.
    pub mod error;
    /// 2D vector value type.
    pub mod geometry;
    /// Configuration values consumed at simulation start.
    pub mod params;
    /// Grid-based A* path planner with Bézier smoothing.
    pub mod planner;
    /// Vehicle populations and the genetic-algorithm generation loop.
    pub mod population;
    /// Ray sensor for measuring distance to track edges.
    pub mod ray;
    /// Append-only results recording.
    pub mod results;
    /// Simulation orchestration and algorithm dispatch.
    pub mod sim;
    /// Track pieces and track assembly.
    pub mod track;
    /// Vehicle state, physics integration, and steering policies.
    pub mod vehicle;
}
