//! Result types for recommendation queries.
//!
//! Expected degradations travel alongside the result instead of as errors:
//! an [`Outcome`] always carries a value, plus per-item [`Warning`]s and at
//! most one request-level [`Fallback`] explaining why the list is generic.

use data_loader::{ImdbId, MovieId};
use serde::{Deserialize, Serialize};

/// A movie with its ranking score, addressed by internal id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMovie {
    pub movie_id: MovieId,
    pub score: f32,
}

/// One recommended movie as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub imdb_id: ImdbId,
    pub movie_id: MovieId,
    /// Predicted rating, profile affinity, or popularity score depending on
    /// which path produced the list
    pub score: f32,
}

/// Non-fatal, per-item problems with a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Warning {
    /// Supplied identifier did not resolve; it was left out
    UnknownIdentifier(String),
    /// Liked movie has no factors, so it contributed nothing
    NoSignal(ImdbId),
}

/// Why a request was answered from the popularity ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// No trained model is installed yet
    NoModelLoaded,
    /// The user id has never been seen
    UnknownUser,
    /// The user is known but has no factors
    ColdUser,
    /// Every liked movie was unknown or had no factors
    EmptyProfileAfterFiltering,
}

/// A value plus the degradations that shaped it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
    pub fallback: Option<Fallback>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
            fallback: None,
        }
    }

    pub fn fallback(value: T, reason: Fallback) -> Self {
        Self {
            value,
            warnings: Vec::new(),
            fallback: Some(reason),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Whether the value came from the popularity fallback
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Transform the value, keeping warnings and fallback
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Outcome<U>, E> {
        Ok(Outcome {
            value: f(self.value)?,
            warnings: self.warnings,
            fallback: self.fallback,
        })
    }
}

/// What the public query interface returns
pub type Recommendations = Outcome<Vec<Recommendation>>;

/// Whether the engine currently serves a trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    ModelLoaded,
    NoModel,
}
