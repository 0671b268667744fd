//! Error types for the engine crate.
//!
//! Queries degrade instead of failing: unknown ids, cold users and a missing
//! model all produce a result with warnings or a fallback flag. The one
//! failure a query can surface is [`EngineError::InvariantViolation`]. The
//! remaining variants come from loading or assembling snapshots.

use thiserror::Error;
use trainer::TrainerError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The snapshot contradicts itself (e.g. the model scored a movie the
    /// identifier table does not know). Aborts the request.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A snapshot failed its consistency checks on assembly or load
    #[error("Inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    #[error("Model error: {0}")]
    ModelError(#[from] TrainerError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;
