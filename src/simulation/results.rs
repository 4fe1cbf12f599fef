//! Result records and the sinks that persist them.
//!
//! A simulation run emits three kinds of record: one per test with the
//! physics settings, one per test with the algorithm settings, and one per
//! vehicle that reaches the goal. Sinks decide where those records go; the
//! shipped ones keep them in memory or append them to a JSON-lines file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::SimError;
use super::params::{AlgorithmSettings, PhysicsSettings};

/// Physics and track metadata for one test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    /// Identifier linking algorithm and vehicle records to this test.
    pub test_id: u32,
    /// Name of the track driven.
    pub track_name: String,
    /// When the test started.
    pub started_at: DateTime<Utc>,
    /// Physics settings in force for the whole test.
    pub physics: PhysicsSettings,
}

/// Algorithm choice and tuning for one test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmRecord {
    /// Test this configuration belongs to.
    pub test_id: u32,
    /// The configured algorithm and its settings.
    pub settings: AlgorithmSettings,
}

/// Outcome of one vehicle reaching the goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Test this vehicle drove in.
    pub test_id: u32,
    /// Restart (or generation) counter the vehicle finished under.
    pub vehicle_no: u32,
    /// Seconds from spawn to goal.
    pub completion_time: f32,
    /// Total distance travelled.
    pub distance_travelled: f32,
    /// Error score on arrival; zero is a clean run.
    pub errors_made: f32,
}

/// Destination for result records.
pub trait ResultsSink {
    /// Records the start of a test with its physics settings.
    fn test_started(&mut self, record: &TestRecord) -> Result<(), SimError>;

    /// Records the algorithm configuration of a test.
    fn algorithm_configured(&mut self, record: &AlgorithmRecord) -> Result<(), SimError>;

    /// Records a vehicle reaching the goal.
    fn vehicle_completed(&mut self, record: &VehicleRecord) -> Result<(), SimError>;
}

/// Sink that keeps every record in memory, mainly for tests and summaries.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Recorded test starts.
    pub tests: Vec<TestRecord>,
    /// Recorded algorithm configurations.
    pub algorithms: Vec<AlgorithmRecord>,
    /// Recorded vehicle completions.
    pub vehicles: Vec<VehicleRecord>,
}

impl ResultsSink for MemorySink {
    fn test_started(&mut self, record: &TestRecord) -> Result<(), SimError> {
        self.tests.push(record.clone());
        Ok(())
    }

    fn algorithm_configured(&mut self, record: &AlgorithmRecord) -> Result<(), SimError> {
        self.algorithms.push(record.clone());
        Ok(())
    }

    fn vehicle_completed(&mut self, record: &VehicleRecord) -> Result<(), SimError> {
        self.vehicles.push(record.clone());
        Ok(())
    }
}

/// One line in a JSON-lines results file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum ResultLine {
    Test(TestRecord),
    Algorithm(AlgorithmRecord),
    Vehicle(VehicleRecord),
}

/// Sink that appends records to a JSON-lines file, one record per line.
#[derive(Debug)]
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Opens (or creates) the results file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &ResultLine) -> Result<(), SimError> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ResultsSink for JsonlSink {
    fn test_started(&mut self, record: &TestRecord) -> Result<(), SimError> {
        self.write_line(&ResultLine::Test(record.clone()))
    }

    fn algorithm_configured(&mut self, record: &AlgorithmRecord) -> Result<(), SimError> {
        self.write_line(&ResultLine::Algorithm(record.clone()))
    }

    fn vehicle_completed(&mut self, record: &VehicleRecord) -> Result<(), SimError> {
        self.write_line(&ResultLine::Vehicle(record.clone()))
    }
}
