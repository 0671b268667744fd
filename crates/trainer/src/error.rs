//! Error types for the trainer crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    /// Nothing to fit
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// A hyperparameter is out of its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A loaded artifact is internally inconsistent
    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, TrainerError>;
