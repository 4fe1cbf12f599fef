//! A population of vehicles driving one track, including the genetic
//! generation cycle.
//!
//! Path-following and reactive populations hold a single vehicle. Genetic
//! populations hold many, score them with a fitness function when they
//! die, and periodically rebuild the whole generation from a
//! stochastically selected survivor.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::info;

use super::brain::Network;
use super::error::SimError;
use super::geometry::Vec2;
use super::params::{AlgorithmSettings, PhysicsSettings};
use super::planner::PathPlanner;
use super::results::{ResultsSink, VehicleRecord};
use super::track::Track;
use super::vehicle::{RAY_COUNT, RAY_LENGTH, Steering, Vehicle};

/// Seconds a generation lives before the next reset, before the
/// best-fitness extension.
const GENERATION_DURATION: f32 = 7.0;

/// A dead vehicle ranked for parent selection.
///
/// Orders by fitness, breaking ties toward the earlier vehicle index so
/// selection stays deterministic under a fixed seed.
#[derive(Debug, Clone, Copy)]
struct RankedVehicle {
    fitness: f32,
    index: usize,
}

impl PartialEq for RankedVehicle {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedVehicle {}

impl PartialOrd for RankedVehicle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedVehicle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fitness
            .total_cmp(&other.fitness)
            .then(other.index.cmp(&self.index))
    }
}

/// Bookkeeping for the genetic generation cycle.
#[derive(Debug)]
struct GenerationState {
    generation: u32,
    clock: f32,
    best_fitness: f32,
    best_brain: Option<Network>,
    mutation_rate: f32,
    mutation_chance: f32,
    rng: StdRng,
}

/// The vehicles driving one track under one algorithm.
#[derive(Debug)]
pub struct Population {
    vehicles: Vec<Vehicle>,
    planner: Option<PathPlanner>,
    generation: Option<GenerationState>,
    spawn: Vec2,
    test_id: u32,
    vehicle_no: u32,
}

impl Population {
    /// Builds a population on `track` for the configured algorithm.
    ///
    /// Path followers plan their route here; a track the sampled grid
    /// cannot cross fails with [`SimError::NoPath`]. A genetic population
    /// of size zero fails with [`SimError::InvalidPopulationSize`].
    pub fn new(
        track: &Track,
        physics: &PhysicsSettings,
        settings: &AlgorithmSettings,
        seed: Option<u64>,
    ) -> Result<Self, SimError> {
        let spawn = track.start_piece().pos();
        let piece_count = track.pieces().len();

        let mut planner = None;
        let mut generation = None;
        let vehicles = match settings {
            AlgorithmSettings::PathFollow { follow_strength } => {
                planner = Some(PathPlanner::new(track, spawn)?);
                vec![Vehicle::new(
                    physics,
                    spawn,
                    piece_count,
                    Steering::PathFollow {
                        follow_strength: *follow_strength,
                    },
                )]
            }
            AlgorithmSettings::Wander { follow_strength } => {
                vec![Vehicle::new(
                    physics,
                    spawn,
                    piece_count,
                    Steering::Wander {
                        follow_strength: *follow_strength,
                        ray_distances: vec![RAY_LENGTH; RAY_COUNT],
                    },
                )]
            }
            AlgorithmSettings::Genetic {
                population_size,
                mutation_rate,
                mutation_chance,
                ..
            } => {
                if *population_size == 0 {
                    return Err(SimError::InvalidPopulationSize(*population_size));
                }
                generation = Some(GenerationState {
                    generation: 0,
                    clock: 0.0,
                    best_fitness: 0.0,
                    best_brain: None,
                    mutation_rate: *mutation_rate,
                    mutation_chance: *mutation_chance,
                    rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
                });
                (0..*population_size)
                    .map(|_| Vehicle::new(physics, spawn, piece_count, Steering::neural()))
                    .collect()
            }
        };

        Ok(Self {
            vehicles,
            planner,
            generation,
            spawn,
            test_id: 0,
            vehicle_no: 0,
        })
    }

    /// Links finishing vehicles to a test id for result records.
    pub fn set_test_id(&mut self, test_id: u32) {
        self.test_id = test_id;
    }

    /// Sets the counter stamped onto the next completion records.
    pub fn set_vehicle_no(&mut self, vehicle_no: u32) {
        self.vehicle_no = vehicle_no;
    }

    /// All vehicles in the population.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// The planned path, for path-following populations.
    pub fn planner(&self) -> Option<&PathPlanner> {
        self.planner.as_ref()
    }

    /// Generation counter, zero for non-genetic populations.
    pub fn generation_number(&self) -> u32 {
        self.generation.as_ref().map_or(0, |g| g.generation)
    }

    /// Brain of the best vehicle from the last completed generation.
    pub fn best_brain(&self) -> Option<&Network> {
        self.generation.as_ref().and_then(|g| g.best_brain.as_ref())
    }

    /// Installs a pre-trained network into vehicle zero.
    ///
    /// Fails with [`SimError::NetworkShape`] when the layer shapes do not
    /// match, and leaves the existing brain untouched in that case.
    pub fn install_network(
        &mut self,
        weights: Vec<ndarray::Array2<f32>>,
        biases: Vec<ndarray::Array1<f32>>,
    ) -> Result<(), SimError> {
        if let Some(vehicle) = self.vehicles.first_mut() {
            if let Steering::Neural { brain, .. } = &mut vehicle.steering {
                brain.set_network(weights, biases)?;
            }
        }
        Ok(())
    }

    /// Advances every vehicle by one tick and runs the goal check and,
    /// for genetic populations, the generation clock.
    pub fn update(
        &mut self,
        dt: f32,
        track: &Track,
        sink: &mut dyn ResultsSink,
    ) -> Result<(), SimError> {
        // Goal check first: a vehicle that ended last tick inside the goal
        // radius finishes before it moves again.
        let goal = track.end_piece().centre();
        let goal_radius = track.end_piece().size().x / 2.0;
        for vehicle in &mut self.vehicles {
            if !vehicle.alive {
                continue;
            }
            if goal.distance(vehicle.pos) < goal_radius {
                vehicle.kill(track);
                sink.vehicle_completed(&VehicleRecord {
                    test_id: self.test_id,
                    vehicle_no: self.vehicle_no,
                    completion_time: vehicle.results.time_active,
                    distance_travelled: vehicle.results.distance_travelled,
                    errors_made: vehicle.results.errors_made,
                })?;
                self.vehicle_no += 1;
            }
        }

        for vehicle in &mut self.vehicles {
            vehicle.update(dt, track, self.planner.as_ref());
        }

        let mut generation_due = false;
        if let Some(state) = &mut self.generation {
            state.clock += dt;
            if state.clock >= GENERATION_DURATION + state.best_fitness / 10.0 {
                state.clock = 0.0;
                generation_due = true;
            }
        }
        if generation_due {
            self.reset_generation(track);
        }

        Ok(())
    }

    /// Rebuilds the generation from a ranked, stochastically selected
    /// survivor.
    ///
    /// Candidates are drawn best-first; each draw is accepted with the
    /// configured chance, so worse vehicles occasionally parent the next
    /// generation. Every offspring copies the survivor's brain and mutates
    /// a number of elements that grows with its index, so later vehicles
    /// vary more.
    fn reset_generation(&mut self, track: &Track) {
        let Some(state) = &mut self.generation else {
            return;
        };

        state.generation += 1;
        self.vehicle_no = state.generation;

        for vehicle in &mut self.vehicles {
            if vehicle.alive {
                vehicle.kill(track);
            }
        }

        let mut ranked: BinaryHeap<RankedVehicle> = self
            .vehicles
            .iter()
            .enumerate()
            .map(|(index, v)| RankedVehicle {
                fitness: v.fitness(),
                index,
            })
            .collect();

        let mut chosen = ranked.pop().unwrap_or(RankedVehicle {
            fitness: 0.0,
            index: 0,
        });
        for _ in 1..self.vehicles.len() {
            if state.rng.random::<f32>() <= state.mutation_chance {
                break;
            }
            match ranked.pop() {
                Some(next) => chosen = next,
                None => break,
            }
        }

        state.best_fitness = chosen.fitness;
        let parent_brain = match &self.vehicles[chosen.index].steering {
            Steering::Neural { brain, .. } => brain.clone(),
            _ => return,
        };
        state.best_brain = Some(parent_brain.clone());

        info!(
            generation = state.generation,
            best_fitness = state.best_fitness,
            parent = chosen.index,
            "generation reset"
        );

        // The survivor keeps its brain unchanged in slot zero.
        if let Steering::Neural { brain, .. } = &mut self.vehicles[0].steering {
            *brain = parent_brain.clone();
        }
        self.vehicles[0].reset(self.spawn);

        for i in 1..self.vehicles.len() {
            let mut offspring = parent_brain.clone();
            let mutations = (state.mutation_rate * (i * i) as f32 / 5.0) as usize;
            offspring.mutate_elements(mutations, &mut state.rng);

            if let Steering::Neural { brain, .. } = &mut self.vehicles[i].steering {
                *brain = offspring;
            }
            self.vehicles[i].reset(self.spawn);
        }
    }
}
