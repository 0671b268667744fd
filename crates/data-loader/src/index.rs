//! Dataset loading: parse the raw files, build the identifier table, join
//! ratings to public identifiers and build the rating matrix and popularity
//! index in one pass.

use crate::error::{DataLoadError, Result};
use crate::mapper::{IdentifierMapper, RejectedIdentifier};
use crate::matrix::{RatingMatrix, RatingMatrixBuilder};
use crate::parser;
use crate::popularity::PopularityIndex;
use crate::types::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Everything ingestion produces
#[derive(Debug, Clone)]
pub struct Dataset {
    pub mapper: IdentifierMapper,
    pub matrix: RatingMatrix,
    pub popularity: PopularityIndex,
    /// Link rows whose identifier was malformed or a duplicate
    pub rejected_links: Vec<RejectedIdentifier>,
}

impl Dataset {
    /// Load a MovieLens-style dataset from a directory
    ///
    /// Expects `links.csv` and `ratings.csv`; the two files are parsed in
    /// parallel.
    #[instrument(skip_all, fields(data_dir = %data_dir.display()))]
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading dataset");

        let links_path = data_dir.join("links.csv");
        let ratings_path = data_dir.join("ratings.csv");

        let (links, ratings) = rayon::join(
            || parser::parse_links(&links_path),
            || parser::parse_ratings(&ratings_path),
        );
        let links = links?;
        let ratings = ratings?;

        info!(links = links.len(), ratings = ratings.len(), "Parsed dataset files");

        Self::from_records(links, ratings)
    }

    /// Build a dataset from already-parsed link and rating rows
    pub fn from_records(links: Vec<Link>, ratings: Vec<RawRating>) -> Result<Self> {
        let (mapper, rejected_links) =
            IdentifierMapper::from_raw(links.iter().map(|l| l.imdb_id.as_str()));

        for rejected in &rejected_links {
            warn!(
                movie_id = links[rejected.position].movie_id,
                raw = %rejected.raw,
                reason = ?rejected.reason,
                "Rejected link"
            );
        }
        if mapper.is_empty() {
            return Err(DataLoadError::ValidationError(
                "no valid movie links".to_string(),
            ));
        }

        // Dataset movie id -> public identifier, for accepted links only
        let mut resolved: HashMap<DatasetMovieId, &str> = HashMap::new();
        let rejected_positions: Vec<usize> = rejected_links.iter().map(|r| r.position).collect();
        for (position, link) in links.iter().enumerate() {
            if rejected_positions.binary_search(&position).is_err() {
                resolved.entry(link.movie_id).or_insert(link.imdb_id.as_str());
            }
        }

        let mut builder = RatingMatrixBuilder::new(&mapper);
        for rating in ratings {
            match resolved.get(&rating.movie_id) {
                Some(imdb_id) => {
                    builder.push(RatingRecord {
                        user_id: rating.user_id,
                        imdb_id: imdb_id.to_string(),
                        rating: rating.rating,
                        timestamp: rating.timestamp,
                    });
                }
                None => builder.push_orphan(OrphanRating {
                    user_id: rating.user_id,
                    reference: format!("movieId={}", rating.movie_id),
                }),
            }
        }
        let matrix = builder.build();
        let popularity = PopularityIndex::build(matrix.movie_stats());

        info!(
            movies = mapper.len(),
            users = matrix.num_users(),
            ratings = matrix.len(),
            rejected_links = rejected_links.len(),
            "Dataset ready"
        );

        Ok(Self {
            mapper,
            matrix,
            popularity,
            rejected_links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(movie_id: DatasetMovieId, imdb_id: &str) -> Link {
        Link {
            movie_id,
            imdb_id: imdb_id.to_string(),
        }
    }

    fn raw(user_id: UserId, movie_id: DatasetMovieId, rating: f32) -> RawRating {
        RawRating {
            user_id,
            movie_id,
            rating,
            timestamp: 964982703,
        }
    }

    #[test]
    fn test_from_records_joins_through_links() {
        let dataset = Dataset::from_records(
            vec![link(1, "tt0114709"), link(2, "tt0113497")],
            vec![raw(1, 1, 4.0), raw(1, 2, 3.0), raw(2, 1, 5.0)],
        )
        .unwrap();

        assert_eq!(dataset.mapper.len(), 2);
        assert_eq!(dataset.matrix.len(), 3);
        // tt0113497 sorts first
        assert_eq!(dataset.mapper.to_internal("tt0113497").unwrap(), 0);
        assert_eq!(dataset.popularity.top(1), vec![1]);
    }

    #[test]
    fn test_unlinked_and_rejected_links_become_orphans() {
        let dataset = Dataset::from_records(
            vec![link(1, "tt0114709"), link(2, "tt1"), link(3, "tt114709")],
            vec![raw(1, 1, 4.0), raw(1, 2, 3.0), raw(1, 3, 3.0), raw(1, 4, 2.0)],
        )
        .unwrap();

        assert_eq!(dataset.rejected_links.len(), 2);
        assert_eq!(dataset.matrix.len(), 1);
        let orphans = &dataset.matrix.report().orphans;
        assert_eq!(orphans.len(), 3);
        assert_eq!(orphans[0].reference, "movieId=2");
    }

    #[test]
    fn test_no_valid_links_is_an_error() {
        let result = Dataset::from_records(vec![link(1, "bogus")], vec![raw(1, 1, 4.0)]);
        assert!(matches!(result, Err(DataLoadError::ValidationError(_))));
    }
}
