//! Scoring & ranking over internal ids.
//!
//! Two personalized paths, kept separate on purpose:
//! - known user: full predicted rating `mu + b_u + b_i + p_u . q_i`
//! - profile: `avg(q_liked) . q_i + b_i`, a relative affinity with no
//!   global mean or user bias since there is no real user behind it
//!
//! Both fall back to the popularity ranking whenever there is nothing
//! personal to score with. Ties are broken by popularity rank, then by
//! internal id, so every list is fully deterministic.

use crate::error::{EngineError, Result};
use crate::snapshot::Snapshot;
use crate::types::{Fallback, Outcome, ScoredMovie, Warning};
use data_loader::{MovieId, PopularityIndex, UserIdx};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;
use trainer::dot;

/// The popularity ranking's first `n` movies that pass `keep`, each scored
/// with its popularity score
pub fn popular_excluding(
    popularity: &PopularityIndex,
    n: usize,
    keep: impl Fn(MovieId) -> bool,
) -> Vec<ScoredMovie> {
    popularity
        .top_entries(popularity.len())
        .iter()
        .filter(|e| keep(e.movie_id))
        .take(n)
        .map(|e| ScoredMovie {
            movie_id: e.movie_id,
            score: e.score,
        })
        .collect()
}

/// Popularity `top(n)` with scores
pub fn popular(snapshot: &Snapshot, n: usize) -> Vec<ScoredMovie> {
    popular_excluding(snapshot.popularity(), n, |_| true)
}

/// Score desc, popularity rank asc, movie id asc
fn compare(popularity: &PopularityIndex, a: &ScoredMovie, b: &ScoredMovie) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| popularity.rank(a.movie_id).cmp(&popularity.rank(b.movie_id)))
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

/// Keep the best `n` scored movies, in ranked order
fn top_n(mut scored: Vec<ScoredMovie>, popularity: &PopularityIndex, n: usize) -> Vec<ScoredMovie> {
    if n == 0 {
        return Vec::new();
    }
    if scored.len() > n {
        scored.select_nth_unstable_by(n - 1, |a, b| compare(popularity, a, b));
        scored.truncate(n);
    }
    scored.sort_unstable_by(|a, b| compare(popularity, a, b));
    scored
}

/// Recommend for a user of the snapshot's directory.
///
/// Movies the user already rated are never returned, on either path.
pub fn recommend_for_user(snapshot: &Snapshot, user: UserIdx, n: usize) -> Outcome<Vec<ScoredMovie>> {
    let history = snapshot.users();
    let unrated = |movie: MovieId| !history.has_rated(user, movie);

    let Some(model) = snapshot.model() else {
        return Outcome::fallback(
            popular_excluding(snapshot.popularity(), n, unrated),
            Fallback::NoModelLoaded,
        );
    };
    if !model.has_user(user) {
        debug!(user, "User has no factors, using popularity");
        return Outcome::fallback(
            popular_excluding(snapshot.popularity(), n, unrated),
            Fallback::ColdUser,
        );
    }

    let candidates: Vec<MovieId> = model
        .items()
        .map(|(movie, _)| movie)
        .filter(|&movie| unrated(movie))
        .collect();
    let scored: Vec<ScoredMovie> = candidates
        .par_iter()
        .filter_map(|&movie| {
            model
                .predict(user, movie)
                .map(|score| ScoredMovie { movie_id: movie, score })
        })
        .collect();

    debug!(user, candidates = scored.len(), "Scored user candidates");
    Outcome::new(top_n(scored, snapshot.popularity(), n))
}

/// Recommend from a set of liked movies with no user behind them.
///
/// Liked movies without factors are reported as [`Warning::NoSignal`] and
/// skipped. The liked set itself is never returned.
pub fn recommend_for_profile(
    snapshot: &Snapshot,
    liked: &BTreeSet<MovieId>,
    n: usize,
) -> Result<Outcome<Vec<ScoredMovie>>> {
    let not_liked = |movie: MovieId| !liked.contains(&movie);
    let fallback = |reason| {
        Outcome::fallback(popular_excluding(snapshot.popularity(), n, not_liked), reason)
    };

    if liked.is_empty() {
        return Ok(fallback(Fallback::EmptyProfileAfterFiltering));
    }
    let Some(model) = snapshot.model() else {
        return Ok(fallback(Fallback::NoModelLoaded));
    };

    let mut warnings = Vec::new();
    let mut affinity = vec![0.0f32; model.k()];
    let mut contributing = 0usize;
    // BTreeSet iteration keeps the sum in a fixed order
    for &movie in liked {
        match model.item_factors(movie) {
            Some(q) => {
                for (a, x) in affinity.iter_mut().zip(q) {
                    *a += x;
                }
                contributing += 1;
            }
            None => {
                let imdb_id = snapshot.catalog().to_public(movie).map_err(|e| {
                    EngineError::InvariantViolation(format!("liked movie {movie}: {e}"))
                })?;
                warnings.push(Warning::NoSignal(imdb_id.clone()));
            }
        }
    }

    if contributing == 0 {
        return Ok(fallback(Fallback::EmptyProfileAfterFiltering).with_warnings(warnings));
    }
    let scale = 1.0 / contributing as f32;
    for a in affinity.iter_mut() {
        *a *= scale;
    }

    let candidates: Vec<(MovieId, &[f32])> = model
        .items()
        .filter(|&(movie, _)| not_liked(movie))
        .collect();
    let scored: Vec<ScoredMovie> = candidates
        .par_iter()
        .map(|&(movie, q)| ScoredMovie {
            movie_id: movie,
            score: dot(&affinity, q) + model.item_bias(movie),
        })
        .collect();

    debug!(liked = liked.len(), contributing, candidates = scored.len(), "Scored profile candidates");
    Ok(Outcome::new(top_n(scored, snapshot.popularity(), n)).with_warnings(warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use data_loader::{IdentifierMapper, ImdbId, MovieStats, RatingMatrix, RatingRecord};
    use std::collections::{BTreeMap, HashMap};
    use trainer::ModelArtifact;

    fn catalog(n: usize) -> IdentifierMapper {
        IdentifierMapper::from_identifiers(
            (1..=n).map(|i| ImdbId::parse(&format!("tt{:07}", i)).unwrap()),
        )
        .unwrap()
    }

    fn popularity(stats: &[(MovieId, f32, u32)]) -> PopularityIndex {
        let stats: HashMap<MovieId, MovieStats> = stats
            .iter()
            .map(|&(id, avg_rating, rating_count)| {
                (
                    id,
                    MovieStats {
                        avg_rating,
                        rating_count,
                    },
                )
            })
            .collect();
        PopularityIndex::build(&stats)
    }

    /// One user (index 0) who rated movie 0; hand-set 1-d factors
    fn snapshot_with(model: Option<ModelArtifact>) -> Snapshot {
        let mapper = catalog(5);
        let matrix = RatingMatrix::build(
            &mapper,
            vec![RatingRecord {
                user_id: 10,
                imdb_id: "tt0000001".to_string(),
                rating: 4.0,
                timestamp: 1,
            }],
        );
        Snapshot::new(
            mapper,
            matrix.user_directory(),
            popularity(&[(0, 4.0, 100), (1, 3.0, 100), (2, 5.0, 100), (3, 2.0, 100)]),
            model,
        )
        .unwrap()
    }

    fn model() -> ModelArtifact {
        // Movie 4 is cold; movies 1 and 3 score identically for user 0
        ModelArtifact::new(
            3.0,
            BTreeMap::from([(0, vec![1.0])]),
            BTreeMap::from([
                (0, vec![1.0]),
                (1, vec![0.5]),
                (2, vec![-1.0]),
                (3, vec![0.5]),
            ]),
            BTreeMap::from([(0, 0.0)]),
            BTreeMap::from([(0, 0.0), (1, 0.0), (2, 0.0), (3, 0.0)]),
            1,
            Utc::now(),
        )
        .unwrap()
    }

    fn ids(scored: &[ScoredMovie]) -> Vec<MovieId> {
        scored.iter().map(|s| s.movie_id).collect()
    }

    #[test]
    fn test_user_ranking_excludes_rated_and_breaks_ties_by_popularity() {
        let snapshot = snapshot_with(Some(model()));
        let outcome = recommend_for_user(&snapshot, 0, 10);

        assert!(!outcome.used_fallback());
        // 1 and 3 tie on score; 1 is more popular
        assert_eq!(ids(&outcome.value), vec![1, 3, 2]);
        assert_eq!(outcome.value[0].score, 3.5);
    }

    #[test]
    fn test_no_model_uses_popularity_minus_history() {
        let snapshot = snapshot_with(None);
        let outcome = recommend_for_user(&snapshot, 0, 2);

        assert_eq!(outcome.fallback, Some(Fallback::NoModelLoaded));
        // popularity order is 2, 0, 1, 3; user 0 rated movie 0
        assert_eq!(ids(&outcome.value), vec![2, 1]);
    }

    #[test]
    fn test_cold_user_uses_popularity() {
        let snapshot = snapshot_with(Some(
            ModelArtifact::new(
                3.0,
                BTreeMap::new(),
                BTreeMap::from([(1, vec![0.5])]),
                BTreeMap::new(),
                BTreeMap::from([(1, 0.0)]),
                1,
                Utc::now(),
            )
            .unwrap(),
        ));
        let outcome = recommend_for_user(&snapshot, 0, 10);

        assert_eq!(outcome.fallback, Some(Fallback::ColdUser));
        assert_eq!(ids(&outcome.value), vec![2, 1, 3]);
        assert_eq!(outcome.value[0].score, snapshot.popularity().get(2).unwrap().score);
    }

    #[test]
    fn test_profile_uses_affinity_without_mean_or_user_bias() {
        let snapshot = snapshot_with(Some(model()));
        let liked = BTreeSet::from([0]);
        let outcome = recommend_for_profile(&snapshot, &liked, 10).unwrap();

        assert!(!outcome.used_fallback());
        assert_eq!(ids(&outcome.value), vec![1, 3, 2]);
        assert_eq!(outcome.value[0].score, 0.5);
        assert_eq!(outcome.value[2].score, -1.0);
    }

    #[test]
    fn test_profile_with_cold_movie_warns_and_still_scores() {
        let snapshot = snapshot_with(Some(model()));
        let liked = BTreeSet::from([0, 4]);
        let outcome = recommend_for_profile(&snapshot, &liked, 10).unwrap();

        assert!(!outcome.used_fallback());
        assert_eq!(
            outcome.warnings,
            vec![Warning::NoSignal(ImdbId::parse("tt0000005").unwrap())]
        );
        assert!(!ids(&outcome.value).contains(&4));
    }

    #[test]
    fn test_all_cold_profile_falls_back() {
        let snapshot = snapshot_with(Some(model()));
        let liked = BTreeSet::from([4]);
        let outcome = recommend_for_profile(&snapshot, &liked, 3).unwrap();

        assert_eq!(outcome.fallback, Some(Fallback::EmptyProfileAfterFiltering));
        assert_eq!(ids(&outcome.value), snapshot.popularity().top(3));
    }

    #[test]
    fn test_empty_profile_falls_back() {
        let snapshot = snapshot_with(Some(model()));
        let outcome = recommend_for_profile(&snapshot, &BTreeSet::new(), 2).unwrap();

        assert_eq!(outcome.fallback, Some(Fallback::EmptyProfileAfterFiltering));
        assert_eq!(ids(&outcome.value), snapshot.popularity().top(2));
    }

    #[test]
    fn test_zero_limit() {
        let snapshot = snapshot_with(Some(model()));
        assert!(recommend_for_user(&snapshot, 0, 0).value.is_empty());
        assert!(popular(&snapshot, 0).is_empty());
    }

    #[test]
    fn test_top_n_partial_selection_matches_full_sort() {
        let pop = popularity(&[]);
        let scored: Vec<ScoredMovie> = (0..50)
            .map(|i| ScoredMovie {
                movie_id: i,
                score: ((i * 7) % 11) as f32,
            })
            .collect();

        let mut full = scored.clone();
        full.sort_by(|a, b| compare(&pop, a, b));
        full.truncate(5);

        assert_eq!(top_n(scored, &pop, 5), full);
    }
}
