//! Error types for the data-loader crate.
//!
//! Ingestion problems that only affect a single record (an orphan rating, a
//! malformed link row) are not errors here: they are collected into reports
//! and logged. The variants below are for failures the caller has to see.

use crate::types::MovieId;
use thiserror::Error;

/// Errors that can occur during data loading, parsing and identifier lookup
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A public identifier could not be normalized
    #[error("Malformed identifier {raw:?}: {reason}")]
    MalformedIdentifier { raw: String, reason: &'static str },

    /// Two movies normalize to the same public identifier
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Public identifier is not in the mapping table
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// Internal movie id has no public identifier
    #[error("Unknown internal movie id: {0}")]
    UnknownInternalId(MovieId),

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
