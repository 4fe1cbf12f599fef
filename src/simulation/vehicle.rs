//! Vehicle state, physics integration, and the three steering policies.
//!
//! A vehicle is a point mass with a heading. Each tick the active steering
//! policy chooses a turn state and possibly overrides the velocity, then
//! the shared integrator applies acceleration, drag, and turning, and
//! scores crossings and off-track time.

use ndarray::Array1;
use tracing::debug;

use super::brain::Network;
use super::geometry::Vec2;
use super::params::PhysicsSettings;
use super::planner::PathPlanner;
use super::ray::cast_fan;
use super::track::Track;

/// Number of sensor rays fanned across the forward half-circle.
pub const RAY_COUNT: usize = 3;
/// Sensor range; also the reported reading when a ray hits nothing.
pub const RAY_LENGTH: f32 = 500.0;
/// How far ahead of the vehicle the path follower projects its probe point.
const PATH_LOOKAHEAD: f32 = 100.0;
/// Reactive steering turns away once a side ray reads below this distance
/// scaled by the follow strength.
const WANDER_TURN_DISTANCE: f32 = 75.0;
/// Neural vehicles die slightly inside the body radius, at the inscribed
/// half-diagonal.
const NEURAL_COLLISION_SCALE: f32 = 1.41;

/// Neural network layer sizes for a given sensor count: two hidden layers
/// of four, two outputs (turn left, turn right).
pub fn net_sequence(ray_count: usize) -> Vec<usize> {
    vec![ray_count, 4, 4, 2]
}

/// Which way the vehicle is currently turning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Turning anti-clockwise (heading increases).
    Left,
    /// Holding the current heading.
    #[default]
    None,
    /// Turning clockwise (heading decreases).
    Right,
}

/// Per-vehicle scoring accumulated while the vehicle is alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleResults {
    /// Seconds spent alive.
    pub time_active: f32,
    /// Total distance (not displacement) travelled.
    pub distance_travelled: f32,
    /// Starts at the number of track pieces; each crossing subtracts one,
    /// each second off the track adds one. Zero means a clean full run.
    pub errors_made: f32,
}

/// The control policy driving one vehicle.
#[derive(Debug, Clone)]
pub enum Steering {
    /// Chase the closest point on a planned spline.
    PathFollow {
        /// Fraction of maximum velocity applied per unit of target offset.
        follow_strength: f32,
    },
    /// React to ray readings with fixed avoidance rules.
    Wander {
        /// Scales both the turn thresholds and the approach speed.
        follow_strength: f32,
        /// Latest sensor readings, nearest hit per ray.
        ray_distances: Vec<f32>,
    },
    /// Steer by a neural network fed with ray readings.
    Neural {
        /// The evolving network.
        brain: Network,
        /// Latest sensor readings, nearest hit per ray.
        ray_distances: Vec<f32>,
        /// Score assigned when the vehicle dies.
        fitness: f32,
    },
}

impl Steering {
    /// A neural policy with a freshly randomised brain.
    pub fn neural() -> Self {
        Self::Neural {
            brain: Network::new(&net_sequence(RAY_COUNT)),
            ray_distances: vec![RAY_LENGTH; RAY_COUNT],
            fitness: 0.0,
        }
    }
}

/// One vehicle on the track.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// World position.
    pub pos: Vec2,
    /// Heading in radians; the travel direction is `(cos h, -sin h)`.
    pub heading: f32,
    /// Current velocity.
    pub velocity: Vec2,
    /// Whether the vehicle is still driving.
    pub alive: bool,
    /// Current turn command.
    pub turn_state: TurnState,
    /// Steering policy.
    pub steering: Steering,
    /// Accumulated scoring.
    pub results: VehicleResults,
    /// Whether the throttle is applied; without it the vehicle coasts and
    /// drags to a stop.
    pub driving: bool,

    accel_mag: f32,
    drag_factor: f32,
    max_velocity: f32,
    turn_speed: f32,
    size: Vec2,
    crossed: Vec<bool>,
    last_crossed: Option<usize>,
}

impl Vehicle {
    /// Creates a vehicle at `spawn` on a track of `piece_count` pieces.
    pub fn new(
        physics: &PhysicsSettings,
        spawn: Vec2,
        piece_count: usize,
        steering: Steering,
    ) -> Self {
        Self {
            pos: spawn,
            heading: 0.0,
            velocity: Vec2::ZERO,
            alive: true,
            turn_state: TurnState::None,
            steering,
            results: VehicleResults {
                errors_made: piece_count as f32,
                ..VehicleResults::default()
            },
            driving: false,
            accel_mag: physics.acceleration_magnitude,
            drag_factor: physics.deceleration_magnitude / 100.0,
            max_velocity: physics.maximum_velocity,
            turn_speed: physics.turn_velocity,
            size: Vec2::new(physics.vehicle_width, physics.vehicle_height),
            crossed: vec![false; piece_count],
            last_crossed: None,
        }
    }

    /// Number of track pieces this vehicle has crossed.
    pub fn crossed_count(&self) -> usize {
        self.crossed.iter().filter(|c| **c).count()
    }

    /// Fitness accumulated by a neural vehicle, zero for other policies.
    pub fn fitness(&self) -> f32 {
        match &self.steering {
            Steering::Neural { fitness, .. } => *fitness,
            _ => 0.0,
        }
    }

    /// Advances the vehicle by one tick of `dt` seconds.
    ///
    /// Path followers and wanderers integrate first and steer for the next
    /// tick; neural vehicles sense and decide before integrating, matching
    /// the order their fitness scoring depends on.
    pub fn update(&mut self, dt: f32, track: &Track, planner: Option<&PathPlanner>) {
        if !self.alive {
            return;
        }
        match self.steering {
            Steering::PathFollow { .. } => {
                self.integrate(dt, track);
                if let Some(planner) = planner {
                    self.steer_along_path(planner);
                }
            }
            Steering::Wander { .. } => {
                self.integrate(dt, track);
                self.steer_by_rays(track);
            }
            Steering::Neural { .. } => {
                self.decide_by_brain(track);
                if self.alive {
                    self.integrate(dt, track);
                }
            }
        }
    }

    /// Stops the vehicle and, for neural policies, banks its fitness:
    /// crossings squared, plus a bonus inversely proportional to the
    /// distance left to the next piece.
    pub fn kill(&mut self, track: &Track) {
        self.alive = false;

        let crossings = self.crossed_count();
        let bonus = self.last_crossed.map_or(0.0, |i| {
            300.0 / track.pieces()[i].end_pos().distance(self.pos)
        });
        if let Steering::Neural { fitness, .. } = &mut self.steering {
            *fitness += (crossings * crossings) as f32 + bonus;
            debug!(fitness = *fitness, crossings, "vehicle died");
        }
    }

    /// Returns the vehicle to `spawn` with cleared motion, scoring, and
    /// crossing state. The brain (if any) is kept.
    pub fn reset(&mut self, spawn: Vec2) {
        self.pos = spawn;
        self.heading = 0.0;
        self.velocity = Vec2::ZERO;
        self.driving = false;
        self.turn_state = TurnState::None;
        self.alive = true;
        self.results = VehicleResults {
            errors_made: self.crossed.len() as f32,
            ..VehicleResults::default()
        };
        self.crossed.fill(false);
        self.last_crossed = None;
        match &mut self.steering {
            Steering::Neural {
                ray_distances,
                fitness,
                ..
            } => {
                ray_distances.fill(RAY_LENGTH);
                *fitness = 0.0;
            }
            Steering::Wander { ray_distances, .. } => ray_distances.fill(RAY_LENGTH),
            Steering::PathFollow { .. } => {}
        }
    }

    /// Shared physics step: scoring, acceleration or drag, position, turn.
    fn integrate(&mut self, dt: f32, track: &Track) {
        self.results.time_active += dt;

        let mut inside_track = false;
        for (i, piece) in track.pieces().iter().enumerate() {
            if piece.collision_point(self.pos) {
                inside_track = true;
            }
            if self.crossed[i] {
                continue;
            }
            if piece.crossed(self.pos) {
                self.crossed[i] = true;
                self.last_crossed = Some(i);
                self.results.errors_made -= 1.0;
            }
        }
        if !inside_track {
            self.results.errors_made += dt;
        }

        let acceleration = self.accel_mag * Vec2::from_heading(self.heading);
        if self.driving {
            if self.velocity.magnitude() < self.max_velocity {
                self.velocity += dt * acceleration;
            } else {
                self.velocity = (self.max_velocity - 1.0) * self.velocity.normalized();
            }
        } else if self.velocity.magnitude() >= 1.0 {
            self.velocity = self.drag_factor * self.velocity;
        } else {
            self.velocity = Vec2::ZERO;
        }

        self.pos += dt * self.velocity;
        self.results.distance_travelled += dt * self.velocity.magnitude();

        match self.turn_state {
            TurnState::Left => self.heading += dt * self.turn_speed,
            TurnState::Right => self.heading -= dt * self.turn_speed,
            TurnState::None => {}
        }
    }

    /// Chases the point on the spline closest to a probe projected ahead
    /// of the vehicle.
    fn steer_along_path(&mut self, planner: &PathPlanner) {
        let follow_strength = match &self.steering {
            Steering::PathFollow { follow_strength } => *follow_strength,
            _ => return,
        };

        let ahead = self.pos + PATH_LOOKAHEAD * Vec2::from_heading(self.heading);
        let target = planner.closest_point(ahead);

        let offset = target - self.pos;
        self.velocity = self.max_velocity * (follow_strength / PATH_LOOKAHEAD) * offset;
        self.driving = true;

        let angle = (ahead - self.pos).signed_angle(target - self.pos);
        self.turn_state = if angle > 0.0 {
            TurnState::Right
        } else if angle < 0.0 {
            TurnState::Left
        } else {
            TurnState::None
        };
    }

    /// Turns away from whichever side ray reads too close and throttles by
    /// the forward ray; dies on contact with a wall.
    fn steer_by_rays(&mut self, track: &Track) {
        let readings = cast_fan(self.pos, self.heading, RAY_COUNT, RAY_LENGTH, track.pieces());
        let collision_range = self.size.x.min(self.size.y);

        let follow_strength = match &mut self.steering {
            Steering::Wander {
                follow_strength,
                ray_distances,
            } => {
                ray_distances.clone_from(&readings);
                *follow_strength
            }
            _ => return,
        };

        self.turn_state = if readings[0] < WANDER_TURN_DISTANCE * follow_strength {
            TurnState::Right
        } else if readings[RAY_COUNT - 1] < WANDER_TURN_DISTANCE * follow_strength {
            TurnState::Left
        } else {
            TurnState::None
        };

        // Approach speed scales with the forward clearance.
        let target_offset = readings[RAY_COUNT / 2] * Vec2::from_heading(self.heading);
        self.velocity = self.max_velocity * (follow_strength / RAY_LENGTH) * target_offset;
        self.driving = true;

        if readings.iter().any(|d| *d <= collision_range) {
            self.kill(track);
        }
    }

    /// Feeds the sensor readings through the brain and turns toward the
    /// strongest output; dies on contact with a wall.
    fn decide_by_brain(&mut self, track: &Track) {
        let readings = cast_fan(self.pos, self.heading, RAY_COUNT, RAY_LENGTH, track.pieces());
        let collision_range = self.size.x.min(self.size.y) / NEURAL_COLLISION_SCALE;

        let choice = match &mut self.steering {
            Steering::Neural {
                brain,
                ray_distances,
                ..
            } => {
                ray_distances.clone_from(&readings);
                brain.decide(&Array1::from_vec(readings.clone()))
            }
            _ => return,
        };

        self.turn_state = match choice {
            0 => TurnState::Left,
            _ => TurnState::Right,
        };
        self.driving = true;

        if readings.iter().any(|d| *d <= collision_range) {
            self.kill(track);
        }
    }
}
