//! Autodrome
//!
//! Headless driving simulator: vehicles navigate modular tracks using A*
//! path following, reactive obstacle avoidance, or a neuro-evolved
//! population.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use autodrome::simulation::error::SimError;
use autodrome::simulation::params::{Algorithm, AlgorithmSettings, PhysicsSettings};
use autodrome::simulation::results::{
    AlgorithmRecord, JsonlSink, MemorySink, ResultsSink, TestRecord, VehicleRecord,
};
use autodrome::simulation::sim::Simulation;
use autodrome::simulation::track::{PieceKind, Track, TrackBuilder};
use autodrome::simulation::vehicle::Steering;

/// Headless track driving simulator
#[derive(Parser)]
#[command(name = "autodrome")]
#[command(about = "Simulates vehicles driving modular tracks with pluggable algorithms")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation on a track
    Run {
        /// Track file to drive; a built-in demo track is used when omitted
        #[arg(short, long)]
        track: Option<PathBuf>,

        /// Algorithm to drive with: "Astar", "Genetic", or "Obstacle Avoidance"
        #[arg(short, long, default_value = "Astar")]
        algorithm: String,

        /// Simulated seconds to run for
        #[arg(short, long, default_value = "30")]
        seconds: f32,

        /// Identifier stamped onto result records
        #[arg(long, default_value = "1")]
        test_id: u32,

        /// Steering follow strength as a fraction (A* and obstacle avoidance)
        #[arg(long, default_value = "0.8")]
        follow_strength: f32,

        /// Vehicles per generation (genetic)
        #[arg(long, default_value = "20")]
        population_size: usize,

        /// Mutation rate scaling offspring variance (genetic)
        #[arg(long, default_value = "1.0")]
        mutation_rate: f32,

        /// Chance of accepting each ranked parent candidate (genetic)
        #[arg(long, default_value = "0.05")]
        mutation_chance: f32,

        /// Pre-trained network to seed the first vehicle with (genetic)
        #[arg(long)]
        existing_network: Option<PathBuf>,

        /// Save the best evolved network here after the run (genetic)
        #[arg(long)]
        save_network: Option<PathBuf>,

        /// Seed for the evolution RNG; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Append result records to this JSON-lines file
        #[arg(short, long)]
        results: Option<PathBuf>,
    },

    /// Create a track file from a list of pieces
    CreateTrack {
        /// Pieces to chain after the start piece, e.g. straight curve-right end
        #[arg(required = true)]
        pieces: Vec<String>,

        /// Track name stored in the file
        #[arg(short, long, default_value = "unnamed")]
        name: String,

        /// Where to write the track file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            track,
            algorithm,
            seconds,
            test_id,
            follow_strength,
            population_size,
            mutation_rate,
            mutation_chance,
            existing_network,
            save_network,
            seed,
            results,
        } => {
            let algorithm: Algorithm = algorithm.parse()?;
            let settings = match algorithm {
                Algorithm::Astar => AlgorithmSettings::PathFollow { follow_strength },
                Algorithm::ObstacleAvoidance => AlgorithmSettings::Wander { follow_strength },
                Algorithm::Genetic => AlgorithmSettings::Genetic {
                    population_size,
                    mutation_rate,
                    mutation_chance,
                    existing_network,
                },
            };

            let track = match track {
                Some(path) => Track::load_from_file(&path)
                    .with_context(|| format!("loading track {}", path.display()))?,
                None => demo_track()?,
            };

            run(track, settings, seconds, test_id, seed, save_network, results)?;
        }
        Commands::CreateTrack {
            pieces,
            name,
            output,
        } => {
            let mut builder = TrackBuilder::new();
            for piece in &pieces {
                builder = builder.extend(parse_piece(piece)?);
            }
            let track = builder.finish(name)?;
            track.save_to_file(&output)?;
            info!(path = %output.display(), "track written");
        }
    }

    Ok(())
}

fn run(
    track: Track,
    settings: AlgorithmSettings,
    seconds: f32,
    test_id: u32,
    seed: Option<u64>,
    save_network: Option<PathBuf>,
    results: Option<PathBuf>,
) -> Result<()> {
    let mut memory = MemorySink::default();
    let mut jsonl = match &results {
        Some(path) => Some(JsonlSink::open(path)?),
        None => None,
    };
    // Records always land in memory for the end-of-run summary; the file
    // sink is layered on top when requested.
    let mut sink = TeeSink {
        memory: &mut memory,
        file: jsonl.as_mut(),
    };

    let mut simulation = Simulation::new(
        track,
        PhysicsSettings::default(),
        settings,
        seed,
        test_id,
        &mut sink,
    )?;
    simulation.run_for(seconds, &mut sink)?;

    info!(
        completions = memory.vehicles.len(),
        generations = simulation.population().generation_number(),
        "run finished"
    );
    for record in &memory.vehicles {
        info!(
            vehicle_no = record.vehicle_no,
            completion_time = record.completion_time,
            distance = record.distance_travelled,
            errors = record.errors_made,
            "vehicle finished"
        );
    }

    if let Some(path) = save_network {
        let saved = simulation
            .vehicles()
            .iter()
            .any(|v| matches!(v.steering, Steering::Neural { .. }));
        simulation.save_network(&path)?;
        if saved {
            info!(path = %path.display(), "network saved");
        }
    }

    Ok(())
}

/// Start, two straights, a right-hand bend, and the end.
fn demo_track() -> Result<Track> {
    let track = TrackBuilder::new()
        .extend(PieceKind::Straight)
        .extend(PieceKind::Straight)
        .extend(PieceKind::CurveRight)
        .extend(PieceKind::End)
        .finish("demo")?;
    Ok(track)
}

fn parse_piece(name: &str) -> Result<PieceKind> {
    Ok(match name {
        "straight" => PieceKind::Straight,
        "curve-left" => PieceKind::CurveLeft,
        "curve-right" => PieceKind::CurveRight,
        "end" => PieceKind::End,
        other => bail!("unknown piece kind '{other}'"),
    })
}

/// Fans each record out to the in-memory sink and, when configured, the
/// file sink.
struct TeeSink<'a> {
    memory: &'a mut MemorySink,
    file: Option<&'a mut JsonlSink>,
}

impl ResultsSink for TeeSink<'_> {
    fn test_started(&mut self, record: &TestRecord) -> Result<(), SimError> {
        self.memory.test_started(record)?;
        if let Some(file) = &mut self.file {
            file.test_started(record)?;
        }
        Ok(())
    }

    fn algorithm_configured(&mut self, record: &AlgorithmRecord) -> Result<(), SimError> {
        self.memory.algorithm_configured(record)?;
        if let Some(file) = &mut self.file {
            file.algorithm_configured(record)?;
        }
        Ok(())
    }

    fn vehicle_completed(&mut self, record: &VehicleRecord) -> Result<(), SimError> {
        self.memory.vehicle_completed(record)?;
        if let Some(file) = &mut self.file {
            file.vehicle_completed(record)?;
        }
        Ok(())
    }
}
