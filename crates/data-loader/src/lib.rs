//! # Data Loader Crate
//!
//! Ingestion side of the recommender: public identifiers, the rating matrix
//! and the popularity ranking.
//!
//! ## Main Components
//!
//! - **identifier**: `ImdbId`, the normalized public movie identifier
//! - **mapper**: `IdentifierMapper`, internal movie id <-> public identifier
//! - **matrix**: `RatingMatrixBuilder` and the indexed `RatingMatrix`
//! - **popularity**: `PopularityIndex`, the cold-start fallback ranking
//! - **parser** / **index**: reading `links.csv` + `ratings.csv` into a `Dataset`
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Dataset;
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data/ml-latest-small"))?;
//!
//! let movie = dataset.mapper.to_internal("tt0114709")?;
//! println!("{} ratings, top movie {:?}", dataset.matrix.len(), dataset.popularity.top(1));
//! ```

pub mod error;
pub mod identifier;
pub mod index;
pub mod mapper;
pub mod matrix;
pub mod parser;
pub mod popularity;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use identifier::ImdbId;
pub use index::Dataset;
pub use mapper::{IdentifierMapper, RejectReason, RejectedIdentifier};
pub use matrix::{BuildReport, RatingMatrix, RatingMatrixBuilder, UserDirectory};
pub use popularity::{PopularityEntry, PopularityIndex, DEFAULT_CONFIDENCE};
pub use types::{
    // Type aliases
    DatasetMovieId,
    MovieId,
    UserId,
    UserIdx,
    // Core types
    Link,
    MovieStats,
    OrphanRating,
    Rating,
    RatingRecord,
    RawRating,
    MAX_RATING,
    MIN_RATING,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matrix() {
        let mapper = IdentifierMapper::default();
        let matrix = RatingMatrix::build(&mapper, Vec::new());

        assert!(matrix.is_empty());
        assert_eq!(matrix.num_users(), 0);
        assert_eq!(matrix.global_mean(), 0.0);
        assert!(PopularityIndex::build(matrix.movie_stats()).is_empty());
    }

    #[test]
    fn test_empty_queries() {
        let popularity = PopularityIndex::default();
        let directory = UserDirectory::default();

        // Querying non-existent data should return None or empty slices
        assert!(popularity.top(5).is_empty());
        assert!(!popularity.exists(1));
        assert!(directory.index_of(1).is_none());
        assert!(directory.rated(0).is_empty());
    }
}
