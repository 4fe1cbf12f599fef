#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use autodrome::simulation::brain::Network;
use autodrome::simulation::error::SimError;
use autodrome::simulation::params::{AlgorithmSettings, PhysicsSettings};
use autodrome::simulation::results::MemorySink;
use autodrome::simulation::sim::{Simulation, load_network};
use autodrome::simulation::track::{PieceKind, Track, TrackBuilder};
use autodrome::simulation::vehicle::Steering;
use std::fs;

fn short_track() -> Track {
    TrackBuilder::new()
        .extend(PieceKind::End)
        .finish("short")
        .expect("valid track")
}

fn fast_physics() -> PhysicsSettings {
    PhysicsSettings {
        maximum_velocity: 300.0,
        acceleration_magnitude: 600.0,
        ..PhysicsSettings::default()
    }
}

#[test]
fn test_path_follower_completes_a_straight_track() {
    let mut sink = MemorySink::default();
    let mut simulation = Simulation::new(
        short_track(),
        fast_physics(),
        AlgorithmSettings::PathFollow {
            follow_strength: 0.8,
        },
        None,
        1,
        &mut sink,
    )
    .expect("simulation builds");

    simulation.run_for(30.0, &mut sink).expect("run succeeds");

    assert_eq!(sink.vehicles.len(), 1, "the follower should reach the goal");
    let record = &sink.vehicles[0];
    assert_eq!(record.test_id, 1);
    assert!(record.completion_time >= 1.0);
    assert!(
        (record.distance_travelled - 300.0).abs() / 300.0 < 0.05,
        "distance {} too far from 300",
        record.distance_travelled
    );
    assert!(record.errors_made.abs() < 1e-3, "errors {}", record.errors_made);
}

#[test]
fn test_configuration_records_are_emitted() {
    let mut sink = MemorySink::default();
    let _simulation = Simulation::new(
        short_track(),
        fast_physics(),
        AlgorithmSettings::Wander {
            follow_strength: 0.8,
        },
        None,
        7,
        &mut sink,
    )
    .expect("simulation builds");

    assert_eq!(sink.tests.len(), 1);
    assert_eq!(sink.tests[0].test_id, 7);
    assert_eq!(sink.tests[0].track_name, "short");
    assert_eq!(sink.algorithms.len(), 1);
    assert!(matches!(
        sink.algorithms[0].settings,
        AlgorithmSettings::Wander { .. }
    ));
}

#[test]
fn test_wanderer_drives_and_senses() {
    let track = TrackBuilder::new()
        .extend(PieceKind::Straight)
        .extend(PieceKind::End)
        .finish("wander")
        .expect("valid track");

    let mut sink = MemorySink::default();
    let mut simulation = Simulation::new(
        track,
        PhysicsSettings::default(),
        AlgorithmSettings::Wander {
            follow_strength: 0.8,
        },
        None,
        1,
        &mut sink,
    )
    .expect("simulation builds");

    simulation.run_for(2.0, &mut sink).expect("run succeeds");

    let vehicle = &simulation.vehicles()[0];
    assert!(vehicle.pos.distance(simulation.track().start_piece().pos()) > 1.0);
    match &vehicle.steering {
        Steering::Wander { ray_distances, .. } => {
            assert_eq!(ray_distances.len(), 3);
            assert!(ray_distances.iter().all(|d| *d <= 500.0));
        }
        other => panic!("unexpected steering {other:?}"),
    }
}

#[test]
fn test_zero_population_is_rejected() {
    let mut sink = MemorySink::default();
    let err = Simulation::new(
        short_track(),
        PhysicsSettings::default(),
        AlgorithmSettings::Genetic {
            population_size: 0,
            mutation_rate: 1.0,
            mutation_chance: 0.05,
            existing_network: None,
        },
        None,
        1,
        &mut sink,
    )
    .err()
    .expect("population of zero must fail");
    assert!(matches!(err, SimError::InvalidPopulationSize(0)));
}

#[test]
fn test_generations_cycle_on_the_clock() {
    let mut sink = MemorySink::default();
    let mut simulation = Simulation::new(
        short_track(),
        PhysicsSettings::default(),
        AlgorithmSettings::Genetic {
            population_size: 8,
            mutation_rate: 2.0,
            mutation_chance: 0.05,
            existing_network: None,
        },
        Some(42),
        1,
        &mut sink,
    )
    .expect("simulation builds");

    // The first generation lives seven seconds plus the best-fitness
    // extension, which starts at zero.
    simulation.run_for(7.5, &mut sink).expect("run succeeds");
    assert!(simulation.population().generation_number() >= 1);

    // After a reset every vehicle is back at the spawn, alive, and
    // vehicle zero carries the surviving parent's brain unmutated.
    let brains: Vec<_> = simulation
        .vehicles()
        .iter()
        .map(|v| match &v.steering {
            Steering::Neural { brain, .. } => brain.export(),
            other => panic!("unexpected steering {other:?}"),
        })
        .collect();
    assert_eq!(
        simulation.population().best_brain().map(Network::export),
        Some(brains[0].clone())
    );

    // High mutation counts guarantee the last offspring diverged.
    assert_ne!(brains[0], brains[brains.len() - 1]);
}

#[test]
fn test_offspring_mutation_counts_follow_the_schedule() {
    let mutation_rate = 2.0;
    let mut sink = MemorySink::default();
    let mut simulation = Simulation::new(
        short_track(),
        PhysicsSettings::default(),
        AlgorithmSettings::Genetic {
            population_size: 6,
            mutation_rate,
            mutation_chance: 0.05,
            existing_network: None,
        },
        Some(11),
        1,
        &mut sink,
    )
    .expect("simulation builds");

    simulation.run_for(7.5, &mut sink).expect("run succeeds");
    assert_eq!(simulation.population().generation_number(), 1);

    let exports: Vec<_> = simulation
        .vehicles()
        .iter()
        .map(|v| match &v.steering {
            Steering::Neural { brain, .. } => brain.export(),
            other => panic!("unexpected steering {other:?}"),
        })
        .collect();

    // Vehicle zero holds the unmutated parent; offspring i is mutated by
    // rate * i^2 / 5 draws, each replacing one weight and one bias
    // element. Repeated draws can land on the same element, so the
    // changed-element counts are bounded by the draw count.
    let (parent_weights, parent_biases) = &exports[0];
    for (i, (weights, biases)) in exports.iter().enumerate().skip(1) {
        let draws = (mutation_rate * (i * i) as f32 / 5.0) as usize;

        let changed_weights: usize = weights
            .iter()
            .zip(parent_weights)
            .map(|(w, p)| w.iter().zip(p.iter()).filter(|(a, b)| a != b).count())
            .sum();
        let changed_biases: usize = biases
            .iter()
            .zip(parent_biases)
            .map(|(b, p)| b.iter().zip(p.iter()).filter(|(x, y)| x != y).count())
            .sum();

        assert!(
            changed_weights <= draws,
            "vehicle {i}: {changed_weights} weight changes from {draws} draws"
        );
        assert!(
            changed_biases <= draws,
            "vehicle {i}: {changed_biases} bias changes from {draws} draws"
        );
        if draws == 0 {
            assert_eq!(changed_weights + changed_biases, 0, "vehicle {i} mutated");
        } else {
            assert!(changed_weights >= 1, "vehicle {i} weights untouched");
            assert!(changed_biases >= 1, "vehicle {i} biases untouched");
        }
    }
}

#[test]
fn test_seeded_evolution_is_deterministic() {
    let run = |seed: u64| {
        let mut sink = MemorySink::default();
        let mut simulation = Simulation::new(
            short_track(),
            PhysicsSettings::default(),
            AlgorithmSettings::Genetic {
                population_size: 6,
                mutation_rate: 2.0,
                mutation_chance: 0.05,
                existing_network: None,
            },
            Some(seed),
            1,
            &mut sink,
        )
        .expect("simulation builds");
        simulation.run_for(8.0, &mut sink).expect("run succeeds");
        simulation.population().generation_number()
    };

    assert_eq!(run(9), run(9));
}

#[test]
fn test_network_save_and_load_round_trip() {
    let mut sink = MemorySink::default();
    let simulation = Simulation::new(
        short_track(),
        PhysicsSettings::default(),
        AlgorithmSettings::Genetic {
            population_size: 4,
            mutation_rate: 1.0,
            mutation_chance: 0.05,
            existing_network: None,
        },
        Some(3),
        1,
        &mut sink,
    )
    .expect("simulation builds");

    let save_path = "test_network_round_trip.json";
    simulation.save_network(save_path).expect("save network");

    let loaded = load_network(save_path).expect("load network");
    assert_eq!(loaded.layer_sizes(), vec![3, 4, 4, 2]);

    // A fresh simulation accepts the saved network as a seed brain.
    let mut sink2 = MemorySink::default();
    let seeded = Simulation::new(
        short_track(),
        PhysicsSettings::default(),
        AlgorithmSettings::Genetic {
            population_size: 4,
            mutation_rate: 1.0,
            mutation_chance: 0.05,
            existing_network: Some(save_path.into()),
        },
        Some(3),
        1,
        &mut sink2,
    )
    .expect("seeded simulation builds");
    match &seeded.vehicles()[0].steering {
        Steering::Neural { brain, .. } => assert_eq!(brain.export(), loaded.export()),
        other => panic!("unexpected steering {other:?}"),
    }

    fs::remove_file(save_path).ok();
}

#[test]
fn test_restart_rebuilds_the_population() {
    let mut sink = MemorySink::default();
    let mut simulation = Simulation::new(
        short_track(),
        fast_physics(),
        AlgorithmSettings::PathFollow {
            follow_strength: 0.8,
        },
        None,
        1,
        &mut sink,
    )
    .expect("simulation builds");

    simulation.run_for(30.0, &mut sink).expect("first run");
    assert_eq!(sink.vehicles.len(), 1);
    assert_eq!(sink.vehicles[0].vehicle_no, 0);

    simulation.restart().expect("restart succeeds");
    simulation.run_for(30.0, &mut sink).expect("second run");
    assert_eq!(sink.vehicles.len(), 2);
    assert_eq!(sink.vehicles[1].vehicle_no, 1);
}
