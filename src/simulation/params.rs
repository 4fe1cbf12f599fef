//! Simulation configuration: physics constants and per-algorithm settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::error::SimError;

/// Physical constants shared by every vehicle on the track.
///
/// Values are read once at construction; nothing mutates them while a
/// simulation runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicsSettings {
    /// Speed cap in units per second.
    pub maximum_velocity: f32,
    /// Forward acceleration applied while driving, units per second squared.
    pub acceleration_magnitude: f32,
    /// Passive deceleration as a percentage of velocity retained per tick.
    pub deceleration_magnitude: f32,
    /// Turn rate in radians per second.
    pub turn_velocity: f32,
    /// Vehicle body width.
    pub vehicle_width: f32,
    /// Vehicle body height.
    pub vehicle_height: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            maximum_velocity: 100.0,
            acceleration_magnitude: 50.0,
            deceleration_magnitude: 99.0,
            turn_velocity: 2.0,
            vehicle_width: 10.0,
            vehicle_height: 20.0,
        }
    }
}

/// The control strategy driving a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Plan a path with A* and steer along its smoothed spline.
    Astar,
    /// React to ray sensor readings with fixed avoidance rules.
    ObstacleAvoidance,
    /// Evolve neural steering over generations.
    Genetic,
}

impl FromStr for Algorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Astar" => Ok(Self::Astar),
            "Obstacle Avoidance" => Ok(Self::ObstacleAvoidance),
            "Genetic" => Ok(Self::Genetic),
            other => Err(SimError::InvalidAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Astar => "Astar",
            Self::ObstacleAvoidance => "Obstacle Avoidance",
            Self::Genetic => "Genetic",
        };
        write!(f, "{name}")
    }
}

/// Per-algorithm tuning, tagged by the algorithm it configures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlgorithmSettings {
    /// A* path follower.
    PathFollow {
        /// Steering gain: fraction of the maximum velocity applied per
        /// unit of offset toward the spline target.
        follow_strength: f32,
    },
    /// Reactive ray-sensor wanderer.
    Wander {
        /// Steering gain scaling both the side-ray turn thresholds and
        /// the approach speed.
        follow_strength: f32,
    },
    /// Genetic-algorithm population.
    Genetic {
        /// Number of vehicles per generation.
        population_size: usize,
        /// Scales how many weight elements each offspring mutates.
        mutation_rate: f32,
        /// Probability, as a fraction, of accepting each ranked candidate
        /// during parent selection.
        mutation_chance: f32,
        /// Pre-trained network to seed vehicle zero with.
        existing_network: Option<PathBuf>,
    },
}

impl AlgorithmSettings {
    /// The algorithm these settings configure.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::PathFollow { .. } => Algorithm::Astar,
            Self::Wander { .. } => Algorithm::ObstacleAvoidance,
            Self::Genetic { .. } => Algorithm::Genetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_round_trip() {
        for algorithm in [
            Algorithm::Astar,
            Algorithm::ObstacleAvoidance,
            Algorithm::Genetic,
        ] {
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = "Dijkstra".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, SimError::InvalidAlgorithm(name) if name == "Dijkstra"));
    }
}
