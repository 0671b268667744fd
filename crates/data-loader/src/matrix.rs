//! Rating Matrix Builder.
//!
//! Turns raw rating records into the indexed sparse matrix the trainer
//! consumes, along with the global mean and per-movie statistics. Users get
//! dense indices in ascending order of their external id and the ratings are
//! stored sorted by `(user, movie)`, so a given input always produces the
//! same matrix regardless of record order.

use crate::mapper::IdentifierMapper;
use crate::types::*;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Counts of what happened to the records offered to a builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub accepted: usize,
    pub orphans: Vec<OrphanRating>,
    pub out_of_range: usize,
    pub invalid_timestamps: usize,
    /// Observations dropped in favour of a later rating of the same pair
    pub superseded: usize,
}

/// Indexed sparse user x movie rating matrix.
///
/// Row-compressed: `offsets[u]..offsets[u + 1]` is the slice of `ratings`
/// belonging to user index `u`.
#[derive(Debug, Clone)]
pub struct RatingMatrix {
    ratings: Vec<Rating>,
    offsets: Vec<usize>,
    users: Vec<UserId>,
    num_movies: usize,
    global_mean: f32,
    movie_stats: HashMap<MovieId, MovieStats>,
    report: BuildReport,
}

/// Incremental builder; records are validated and resolved as they arrive.
pub struct RatingMatrixBuilder<'a> {
    mapper: &'a IdentifierMapper,
    observations: HashMap<(UserId, MovieId), (f32, DateTime<Utc>)>,
    report: BuildReport,
}

impl<'a> RatingMatrixBuilder<'a> {
    pub fn new(mapper: &'a IdentifierMapper) -> Self {
        Self {
            mapper,
            observations: HashMap::new(),
            report: BuildReport::default(),
        }
    }

    /// Offer one record. Returns `false` if it was rejected.
    pub fn push(&mut self, record: RatingRecord) -> bool {
        if !(MIN_RATING..=MAX_RATING).contains(&record.rating) {
            self.report.out_of_range += 1;
            return false;
        }
        let Some(timestamp) = DateTime::from_timestamp(record.timestamp, 0) else {
            self.report.invalid_timestamps += 1;
            return false;
        };
        let movie = match self.mapper.to_internal(&record.imdb_id) {
            Ok(movie) => movie,
            Err(_) => {
                self.push_orphan(OrphanRating {
                    user_id: record.user_id,
                    reference: record.imdb_id,
                });
                return false;
            }
        };

        // Latest observation of a (user, movie) pair wins
        match self.observations.get_mut(&(record.user_id, movie)) {
            Some(existing) => {
                self.report.superseded += 1;
                if timestamp >= existing.1 {
                    *existing = (record.rating, timestamp);
                }
            }
            None => {
                self.observations
                    .insert((record.user_id, movie), (record.rating, timestamp));
            }
        }
        true
    }

    /// Record an orphan discovered before the builder saw the rating
    pub fn push_orphan(&mut self, orphan: OrphanRating) {
        warn!(
            user_id = orphan.user_id,
            reference = %orphan.reference,
            "Skipping orphan rating"
        );
        self.report.orphans.push(orphan);
    }

    pub fn build(self) -> RatingMatrix {
        let mut report = self.report;
        report.accepted = self.observations.len();

        let mut users: Vec<UserId> = self.observations.keys().map(|(u, _)| *u).collect();
        users.sort_unstable();
        users.dedup();
        let user_index: HashMap<UserId, UserIdx> = users
            .iter()
            .enumerate()
            .map(|(i, &u)| (u, i as UserIdx))
            .collect();

        let ratings: Vec<Rating> = self
            .observations
            .into_iter()
            .map(|((user_id, movie), (rating, timestamp))| Rating {
                user: user_index[&user_id],
                movie,
                rating,
                timestamp,
            })
            .collect();

        info!(
            accepted = report.accepted,
            orphans = report.orphans.len(),
            out_of_range = report.out_of_range,
            invalid_timestamps = report.invalid_timestamps,
            "Rating matrix built"
        );

        RatingMatrix::from_parts(ratings, users, self.mapper.len(), report)
    }
}

impl RatingMatrix {
    /// Build a matrix from rating records in one go
    pub fn build(
        mapper: &IdentifierMapper,
        records: impl IntoIterator<Item = RatingRecord>,
    ) -> Self {
        let mut builder = RatingMatrixBuilder::new(mapper);
        for record in records {
            builder.push(record);
        }
        builder.build()
    }

    fn from_parts(
        mut ratings: Vec<Rating>,
        users: Vec<UserId>,
        num_movies: usize,
        report: BuildReport,
    ) -> Self {
        ratings.sort_unstable_by_key(|r| (r.user, r.movie));

        let mut offsets = vec![0usize; users.len() + 1];
        for rating in &ratings {
            offsets[rating.user as usize + 1] += 1;
        }
        for u in 0..users.len() {
            offsets[u + 1] += offsets[u];
        }

        let global_mean = if ratings.is_empty() {
            0.0
        } else {
            let total: f64 = ratings.iter().map(|r| r.rating as f64).sum();
            (total / ratings.len() as f64) as f32
        };

        let movie_stats = compute_movie_stats(&ratings);

        Self {
            ratings,
            offsets,
            users,
            num_movies,
            global_mean,
            movie_stats,
            report,
        }
    }

    /// A matrix over the same users and movies holding only the ratings for
    /// which `keep` returns true. Indices are unchanged, so models trained on
    /// the subset can be scored against the remainder.
    pub fn subset(&self, keep: impl Fn(&Rating) -> bool) -> Self {
        let ratings = self.ratings.iter().filter(|r| keep(r)).copied().collect();
        Self::from_parts(
            ratings,
            self.users.clone(),
            self.num_movies,
            BuildReport::default(),
        )
    }

    /// All observations, sorted by `(user, movie)`
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Observations of one user, sorted by movie
    pub fn user_ratings(&self, user: UserIdx) -> &[Rating] {
        let u = user as usize;
        if u >= self.users.len() {
            return &[];
        }
        &self.ratings[self.offsets[u]..self.offsets[u + 1]]
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Size of the movie catalog (rated or not)
    pub fn num_movies(&self) -> usize {
        self.num_movies
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Arithmetic mean of every observed rating
    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// Per-movie statistics; movies without ratings are absent
    pub fn movie_stats(&self) -> &HashMap<MovieId, MovieStats> {
        &self.movie_stats
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Internal index of an external user id
    pub fn user_index(&self, user_id: UserId) -> Option<UserIdx> {
        self.users.binary_search(&user_id).ok().map(|i| i as UserIdx)
    }

    /// Snapshot of users and their rated movies, for query-time exclusion
    pub fn user_directory(&self) -> UserDirectory {
        let rated = (0..self.users.len())
            .map(|u| {
                self.user_ratings(u as UserIdx)
                    .iter()
                    .map(|r| r.movie)
                    .collect()
            })
            .collect();
        UserDirectory {
            users: self.users.clone(),
            rated,
        }
    }
}

fn compute_movie_stats(ratings: &[Rating]) -> HashMap<MovieId, MovieStats> {
    let mut grouped: HashMap<MovieId, Vec<f32>> = HashMap::new();
    for rating in ratings {
        grouped.entry(rating.movie).or_default().push(rating.rating);
    }

    grouped
        .into_par_iter()
        .map(|(movie_id, values)| {
            let rating_count = values.len() as u32;
            let total: f64 = values.iter().map(|&v| v as f64).sum();
            let avg_rating = (total / rating_count as f64) as f32;
            (
                movie_id,
                MovieStats {
                    avg_rating,
                    rating_count,
                },
            )
        })
        .collect()
}

/// Users known to the model and the movies each one has rated.
///
/// Shipped with the model so the query engine can exclude already-rated
/// movies without going back to the ratings store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    /// External user ids, sorted; position is the internal index
    users: Vec<UserId>,
    /// Rated movies per internal index, sorted
    rated: Vec<Vec<MovieId>>,
}

impl UserDirectory {
    pub fn index_of(&self, user_id: UserId) -> Option<UserIdx> {
        self.users.binary_search(&user_id).ok().map(|i| i as UserIdx)
    }

    pub fn user_id(&self, user: UserIdx) -> Option<UserId> {
        self.users.get(user as usize).copied()
    }

    /// Movies rated by a user; empty for unknown indices
    pub fn rated(&self, user: UserIdx) -> &[MovieId] {
        self.rated
            .get(user as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_rated(&self, user: UserIdx, movie: MovieId) -> bool {
        self.rated(user).binary_search(&movie).is_ok()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::ImdbId;

    fn mapper() -> IdentifierMapper {
        IdentifierMapper::from_identifiers(
            ["tt0000010", "tt0000020", "tt0000030"]
                .iter()
                .map(|s| ImdbId::parse(s).unwrap()),
        )
        .unwrap()
    }

    fn record(user_id: UserId, imdb_id: &str, rating: f32, timestamp: i64) -> RatingRecord {
        RatingRecord {
            user_id,
            imdb_id: imdb_id.to_string(),
            rating,
            timestamp,
        }
    }

    #[test]
    fn test_global_mean_and_stats() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(7, "tt0000010", 4.0, 100),
                record(7, "tt0000020", 2.0, 101),
                record(3, "tt0000010", 3.0, 102),
            ],
        );

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.num_users(), 2);
        assert_eq!(matrix.num_movies(), 3);
        assert!((matrix.global_mean() - 3.0).abs() < 1e-6);

        let stats = matrix.movie_stats()[&0];
        assert_eq!(stats.rating_count, 2);
        assert!((stats.avg_rating - 3.5).abs() < 1e-6);
        assert!(!matrix.movie_stats().contains_key(&2));
    }

    #[test]
    fn test_users_are_indexed_in_sorted_order() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(42, "tt0000010", 4.0, 100),
                record(5, "tt0000020", 2.0, 101),
            ],
        );

        assert_eq!(matrix.user_index(5), Some(0));
        assert_eq!(matrix.user_index(42), Some(1));
        assert_eq!(matrix.user_index(6), None);
        assert_eq!(matrix.user_ratings(1)[0].movie, 0);
    }

    #[test]
    fn test_build_is_independent_of_record_order() {
        let mapper = mapper();
        let records = vec![
            record(2, "tt0000030", 4.5, 100),
            record(1, "tt0000010", 1.0, 101),
            record(2, "tt0000010", 3.0, 102),
            record(1, "tt0000020", 5.0, 103),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let a = RatingMatrix::build(&mapper, records);
        let b = RatingMatrix::build(&mapper, reversed);
        assert_eq!(a.ratings(), b.ratings());
    }

    #[test]
    fn test_orphans_are_skipped_not_fatal() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(1, "tt0000010", 4.0, 100),
                record(1, "tt9999999", 4.0, 100),
                record(1, "garbage", 4.0, 100),
            ],
        );

        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.report().orphans.len(), 2);
        assert_eq!(matrix.report().orphans[0].reference, "tt9999999");
    }

    #[test]
    fn test_schema_validation() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(1, "tt0000010", 0.0, 100),
                record(1, "tt0000010", 5.5, 100),
                record(1, "tt0000020", 3.0, i64::MAX),
            ],
        );

        assert!(matrix.is_empty());
        assert_eq!(matrix.report().out_of_range, 2);
        assert_eq!(matrix.report().invalid_timestamps, 1);
    }

    #[test]
    fn test_latest_duplicate_wins() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(1, "tt0000010", 2.0, 200),
                record(1, "tt0000010", 5.0, 100),
            ],
        );

        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.ratings()[0].rating, 2.0);
        assert_eq!(matrix.report().superseded, 1);
    }

    #[test]
    fn test_subset_keeps_indices() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(1, "tt0000010", 4.0, 100),
                record(2, "tt0000020", 2.0, 200),
            ],
        );
        let early = matrix.subset(|r| r.timestamp.timestamp() < 150);

        assert_eq!(early.len(), 1);
        assert_eq!(early.num_users(), 2);
        assert!(early.user_ratings(1).is_empty());
        assert_eq!(early.global_mean(), 4.0);
    }

    #[test]
    fn test_user_directory() {
        let mapper = mapper();
        let matrix = RatingMatrix::build(
            &mapper,
            vec![
                record(9, "tt0000030", 4.0, 100),
                record(9, "tt0000010", 2.0, 100),
            ],
        );
        let directory = matrix.user_directory();

        assert_eq!(directory.index_of(9), Some(0));
        assert_eq!(directory.rated(0), &[0, 2]);
        assert!(directory.has_rated(0, 2));
        assert!(!directory.has_rated(0, 1));
        assert!(directory.rated(5).is_empty());
    }
}
