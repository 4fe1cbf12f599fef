//! Error types shared across the simulation.

use thiserror::Error;

/// Errors surfaced by track construction, planning, and simulation setup.
///
/// Configuration errors are fatal at setup time and abort initialisation;
/// `NoPath` is surfaced by the planner when the sampled grid cannot reach
/// the goal.
#[derive(Debug, Error)]
pub enum SimError {
    /// The track contains no piece tagged as the start.
    #[error("track has no start piece")]
    MissingStartPiece,

    /// The track contains no piece tagged as the end.
    #[error("track has no end piece")]
    MissingEndPiece,

    /// The track contains more than one start piece.
    #[error("track has more than one start piece")]
    DuplicateStartPiece,

    /// The track contains more than one end piece.
    #[error("track has more than one end piece")]
    DuplicateEndPiece,

    /// An algorithm name did not match any known algorithm.
    #[error("invalid algorithm '{0}'")]
    InvalidAlgorithm(String),

    /// A population was requested with zero vehicles.
    #[error("invalid population size {0}")]
    InvalidPopulationSize(usize),

    /// The planner exhausted its open set without reaching the goal.
    #[error("no path found from start to end piece")]
    NoPath,

    /// A loaded network's layer shapes do not match the expected sequence.
    #[error("network shape mismatch: expected layers {expected:?}, found {found:?}")]
    NetworkShape {
        /// Layer size sequence the population was built with.
        expected: Vec<usize>,
        /// Layer size sequence found in the loaded data.
        found: Vec<usize>,
    },

    /// Filesystem failure while persisting or loading state.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while persisting or loading state.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
