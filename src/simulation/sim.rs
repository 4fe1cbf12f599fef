//! Simulation orchestration: wires a track, physics, and an algorithm
//! into a population, drives the tick loop, and persists networks.

use chrono::Utc;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::brain::Network;
use super::error::SimError;
use super::params::{AlgorithmSettings, PhysicsSettings};
use super::population::Population;
use super::results::{AlgorithmRecord, ResultsSink, TestRecord};
use super::track::Track;
use super::vehicle::Vehicle;

/// Fixed physics timestep in seconds. The simulation always advances in
/// whole ticks, so behaviour does not depend on wall-clock frame rate.
pub const TICK: f32 = 1.0 / 60.0;

/// On-disk form of a saved network: the weight matrices and bias vectors
/// of each layer.
#[derive(Debug, Serialize, Deserialize)]
struct NetworkFile {
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
}

/// One configured simulation run.
pub struct Simulation {
    track: Track,
    physics: PhysicsSettings,
    settings: AlgorithmSettings,
    population: Population,
    seed: Option<u64>,
    test_id: u32,
    restart_count: u32,
}

impl Simulation {
    /// Builds a simulation and records its configuration to the sink.
    ///
    /// Fails when the algorithm settings are invalid for the track, and
    /// when a configured pre-trained network cannot be loaded or does not
    /// match the expected layer shapes.
    pub fn new(
        track: Track,
        physics: PhysicsSettings,
        settings: AlgorithmSettings,
        seed: Option<u64>,
        test_id: u32,
        sink: &mut dyn ResultsSink,
    ) -> Result<Self, SimError> {
        sink.test_started(&TestRecord {
            test_id,
            track_name: track.name().to_string(),
            started_at: Utc::now(),
            physics,
        })?;
        sink.algorithm_configured(&AlgorithmRecord {
            test_id,
            settings: settings.clone(),
        })?;

        let mut population = Population::new(&track, &physics, &settings, seed)?;
        population.set_test_id(test_id);

        if let AlgorithmSettings::Genetic {
            existing_network: Some(path),
            ..
        } = &settings
        {
            let (weights, biases) = read_network(path)?;
            population.install_network(weights, biases)?;
            info!(path = %path.display(), "loaded pre-trained network");
        }

        info!(
            algorithm = %settings.algorithm(),
            track = track.name(),
            "simulation initialised"
        );

        Ok(Self {
            track,
            physics,
            settings,
            population,
            seed,
            test_id,
            restart_count: 0,
        })
    }

    /// The track being driven.
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// The vehicles currently driving.
    pub fn vehicles(&self) -> &[Vehicle] {
        self.population.vehicles()
    }

    /// The population, including planner and generation state.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Advances the simulation by one fixed tick.
    pub fn step(&mut self, sink: &mut dyn ResultsSink) -> Result<(), SimError> {
        self.population.update(TICK, &self.track, sink)
    }

    /// Runs whole ticks until at least `seconds` of simulated time have
    /// passed.
    pub fn run_for(&mut self, seconds: f32, sink: &mut dyn ResultsSink) -> Result<(), SimError> {
        let ticks = (seconds / TICK).ceil() as u64;
        for _ in 0..ticks {
            self.step(sink)?;
        }
        Ok(())
    }

    /// Rebuilds the population from the current settings. Completion
    /// records from the new run carry the restart counter.
    pub fn restart(&mut self) -> Result<(), SimError> {
        self.restart_count += 1;
        self.population = Population::new(&self.track, &self.physics, &self.settings, self.seed)?;
        self.population.set_test_id(self.test_id);
        self.population.set_vehicle_no(self.restart_count);
        info!(restart = self.restart_count, "simulation restarted");
        Ok(())
    }

    /// Saves the best evolved network to a JSON file.
    ///
    /// Prefers the parent of the last completed generation; before the
    /// first reset the current first vehicle's brain is saved instead.
    /// Does nothing for non-genetic algorithms.
    pub fn save_network(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let brain = self.population.best_brain().or_else(|| {
            self.population.vehicles().first().and_then(|v| match &v.steering {
                super::vehicle::Steering::Neural { brain, .. } => Some(brain),
                _ => None,
            })
        });
        let Some(brain) = brain else {
            return Ok(());
        };

        let (weights, biases) = brain.export();
        let json = serde_json::to_string(&NetworkFile { weights, biases })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Reads a saved network file back into weights and biases.
fn read_network(path: &Path) -> Result<(Vec<Array2<f32>>, Vec<Array1<f32>>), SimError> {
    let json = std::fs::read_to_string(path)?;
    let file: NetworkFile = serde_json::from_str(&json)?;
    Ok((file.weights, file.biases))
}

/// Loads a saved network file as a standalone [`Network`].
pub fn load_network(path: impl AsRef<Path>) -> Result<Network, SimError> {
    let (weights, biases) = read_network(path.as_ref())?;

    let mut sizes: Vec<usize> = weights.iter().map(|w| w.dim().1).collect();
    if let Some(last) = weights.last() {
        sizes.push(last.dim().0);
    }
    let mut network = Network::new(&sizes);
    network.set_network(weights, biases)?;
    Ok(network)
}
