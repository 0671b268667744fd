//! Core domain types shared by every stage of the recommender.
//!
//! Three kinds of identifiers travel through the system and the aliases
//! below keep them apart:
//! - `UserId`: the user identifier handed to us by the ratings store
//! - `UserIdx`: the dense index a user gets inside the rating matrix
//! - `MovieId`: the dense internal movie index assigned by the
//!   [`IdentifierMapper`](crate::mapper::IdentifierMapper)
//!
//! Movies are addressed at the system boundary by their public
//! [`ImdbId`](crate::identifier::ImdbId).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// User identifier as stored by the external ratings source
pub type UserId = u32;

/// Dense internal user index (position in the sorted user directory)
pub type UserIdx = u32;

/// Dense internal movie index
pub type MovieId = u32;

/// Movie id used by the raw dataset files (the `movieId` column)
pub type DatasetMovieId = u32;

/// Lowest rating accepted at ingestion
pub const MIN_RATING: f32 = 0.5;

/// Highest rating accepted at ingestion
pub const MAX_RATING: f32 = 5.0;

// =============================================================================
// Raw records (as parsed from disk)
// =============================================================================

/// One row of `links.csv`: dataset movie id to public identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub movie_id: DatasetMovieId,
    /// Public identifier as written in the file, already carrying the `tt` prefix
    pub imdb_id: String,
}

/// One row of `ratings.csv`, still keyed by the dataset movie id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    pub user_id: UserId,
    pub movie_id: DatasetMovieId,
    pub rating: f32,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

/// A rating observation addressed by public identifier.
///
/// This is the input schema of the rating matrix builder: whatever store the
/// ratings come from, they reach the builder in this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub imdb_id: String,
    pub rating: f32,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

// =============================================================================
// Indexed types
// =============================================================================

/// A validated, indexed rating observation. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: UserIdx,
    pub movie: MovieId,
    /// Rating value from 0.5 to 5.0
    pub rating: f32,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics for a movie, computed once per build
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovieStats {
    pub avg_rating: f32,
    pub rating_count: u32,
}

/// A rating that referenced a movie the identifier mapper does not know.
///
/// Orphans are skipped and logged; they never fail a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanRating {
    pub user_id: UserId,
    /// The unresolved movie reference (public identifier or dataset movie id)
    pub reference: String,
}
