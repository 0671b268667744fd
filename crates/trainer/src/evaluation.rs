//! Offline evaluation on a chronological holdout.
//!
//! The most recent ratings are held out, a model is trained on the rest and
//! then scored on:
//! - rating accuracy (MAE, RMSE) over held-out pairs the model covers
//! - top-N hit rate and ARHR (average reciprocal hit rank) per test user
//! - coverage: share of the catalog appearing in any top-N list, and share
//!   of test users who received a list
//! - intra-list diversity and novelty, both measured against training
//!   popularity

use crate::artifact::ModelArtifact;
use crate::error::{Result, TrainerError};
use data_loader::{MAX_RATING, MIN_RATING, MovieId, PopularityIndex, Rating, RatingMatrix, UserIdx};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Share of ratings, most recent first, held out for testing
    pub test_fraction: f64,
    /// Users with fewer ratings are left out of the evaluation
    pub min_user_ratings: usize,
    /// List length for hit rate and ARHR
    pub top_n: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            min_user_ratings: 5,
            top_n: 10,
        }
    }
}

impl EvaluationConfig {
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_min_user_ratings(mut self, min_user_ratings: usize) -> Self {
        self.min_user_ratings = min_user_ratings;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// Training matrix plus held-out observations
#[derive(Debug, Clone)]
pub struct HoldoutSplit {
    pub train: RatingMatrix,
    pub test: Vec<Rating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train_size: usize,
    pub test_size: usize,
    /// Held-out pairs where both user and movie have factors
    pub evaluated: usize,
    /// Held-out pairs the model cannot score
    pub uncovered: usize,
    pub mae: f64,
    pub rmse: f64,
    pub hit_rate: f64,
    pub arhr: f64,
    /// Distinct movies recommended to any test user, over the catalog size
    pub catalog_coverage: f64,
    /// Test users who received a non-empty list
    pub user_coverage: f64,
    /// Mean of `1 - popularity similarity` over pairs in each list
    pub diversity: f64,
    /// Mean normalized popularity rank of recommended movies (1.0 = least
    /// popular)
    pub novelty: f64,
}

/// Qualitative label for an error metric, using the thresholds the
/// evaluation report prints
pub fn assess(value: f64, thresholds: [f64; 3]) -> &'static str {
    match value {
        v if v < thresholds[0] => "Excellent",
        v if v < thresholds[1] => "Good",
        v if v < thresholds[2] => "Fair",
        _ => "Needs Improvement",
    }
}

pub const MAE_THRESHOLDS: [f64; 3] = [0.7, 1.0, 1.3];
pub const RMSE_THRESHOLDS: [f64; 3] = [0.9, 1.2, 1.5];

/// Split off the most recent `test_fraction` of the ratings.
///
/// Ratings are ordered by timestamp (ties by user, then movie). Users with
/// fewer than `min_user_ratings` ratings are dropped from both sides.
pub fn chronological_split(matrix: &RatingMatrix, config: &EvaluationConfig) -> Result<HoldoutSplit> {
    if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
        return Err(TrainerError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {}",
            config.test_fraction
        )));
    }

    let mut eligible: Vec<Rating> = matrix
        .ratings()
        .iter()
        .filter(|r| matrix.user_ratings(r.user).len() >= config.min_user_ratings)
        .copied()
        .collect();
    if eligible.is_empty() {
        return Err(TrainerError::EmptyTrainingSet);
    }
    eligible.sort_by_key(|r| (r.timestamp, r.user, r.movie));

    let test_len = (eligible.len() as f64 * config.test_fraction).round() as usize;
    let test = eligible.split_off(eligible.len() - test_len);
    let train_pairs: HashSet<(UserIdx, MovieId)> =
        eligible.iter().map(|r| (r.user, r.movie)).collect();

    let train = matrix.subset(|r| train_pairs.contains(&(r.user, r.movie)));

    info!(train = train.len(), test = test.len(), "Chronological split");
    Ok(HoldoutSplit { train, test })
}

/// Score a model trained on `split.train` against `split.test`
#[instrument(skip_all, fields(test = split.test.len()))]
pub fn evaluate(model: &ModelArtifact, split: &HoldoutSplit, top_n: usize) -> EvaluationReport {
    let (abs_sum, sq_sum, evaluated) = split
        .test
        .par_iter()
        .filter_map(|r| {
            model
                .predict(r.user, r.movie)
                .map(|p| (p.clamp(MIN_RATING, MAX_RATING) - r.rating) as f64)
        })
        .fold(
            || (0.0f64, 0.0f64, 0usize),
            |(a, s, n), err| (a + err.abs(), s + err * err, n + 1),
        )
        .reduce(
            || (0.0, 0.0, 0),
            |(a1, s1, n1), (a2, s2, n2)| (a1 + a2, s1 + s2, n1 + n2),
        );

    let (mae, rmse) = if evaluated > 0 {
        (abs_sum / evaluated as f64, (sq_sum / evaluated as f64).sqrt())
    } else {
        (0.0, 0.0)
    };

    let lists = top_n_lists(model, split, top_n);
    let (hit_rate, arhr) = hit_metrics(&lists);
    let popularity = PopularityIndex::build(split.train.movie_stats());
    let test_users = lists.len();

    let recommended: HashSet<MovieId> = lists
        .iter()
        .flat_map(|l| l.movies.iter().copied())
        .collect();
    let served: Vec<&[MovieId]> = lists
        .iter()
        .filter(|l| !l.movies.is_empty())
        .map(|l| l.movies.as_slice())
        .collect();

    let report = EvaluationReport {
        train_size: split.train.len(),
        test_size: split.test.len(),
        evaluated,
        uncovered: split.test.len() - evaluated,
        mae,
        rmse,
        hit_rate,
        arhr,
        catalog_coverage: ratio(recommended.len(), split.train.num_movies()),
        user_coverage: ratio(served.len(), test_users),
        diversity: mean(served.iter().filter_map(|l| intra_list_diversity(l, &popularity))),
        novelty: mean(served.iter().filter_map(|l| novelty(l, &popularity))),
    };
    info!(
        mae = report.mae,
        rmse = report.rmse,
        hit_rate = report.hit_rate,
        catalog_coverage = report.catalog_coverage,
        "Evaluation complete"
    );
    report
}

/// One test user's top-N list and the movies they rated in the test window
struct TopNList {
    movies: Vec<MovieId>,
    targets: HashSet<MovieId>,
}

/// Top-N lists for every user with held-out ratings. Users without factors
/// get an empty list.
fn top_n_lists(model: &ModelArtifact, split: &HoldoutSplit, top_n: usize) -> Vec<TopNList> {
    let mut held_out: HashMap<UserIdx, HashSet<MovieId>> = HashMap::new();
    for r in &split.test {
        held_out.entry(r.user).or_default().insert(r.movie);
    }

    held_out
        .into_par_iter()
        .map(|(user, targets)| {
            if !model.has_user(user) {
                return TopNList { movies: Vec::new(), targets };
            }
            let rated: HashSet<MovieId> =
                split.train.user_ratings(user).iter().map(|r| r.movie).collect();

            let mut scored: Vec<(MovieId, f32)> = model
                .items()
                .filter(|(movie, _)| !rated.contains(movie))
                .filter_map(|(movie, _)| model.predict(user, movie).map(|s| (movie, s)))
                .collect();
            scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
                Ordering::Equal => a.0.cmp(&b.0),
                other => other,
            });
            scored.truncate(top_n);

            TopNList {
                movies: scored.into_iter().map(|(movie, _)| movie).collect(),
                targets,
            }
        })
        .collect()
}

/// Hit rate and ARHR over users that received a list
fn hit_metrics(lists: &[TopNList]) -> (f64, f64) {
    let per_user: Vec<f64> = lists
        .iter()
        .filter(|l| !l.movies.is_empty())
        .map(|l| {
            l.movies
                .iter()
                .position(|movie| l.targets.contains(movie))
                .map(|rank| 1.0 / (rank + 1) as f64)
                .unwrap_or(0.0)
        })
        .collect();

    if per_user.is_empty() {
        return (0.0, 0.0);
    }
    let hits = per_user.iter().filter(|&&rr| rr > 0.0).count();
    let total = per_user.len() as f64;
    (hits as f64 / total, per_user.iter().sum::<f64>() / total)
}

/// `1 - mean(min(count_i, count_j) / max(count_i, count_j))` over all pairs.
///
/// Movies never rated in training count as one rating. `None` for lists
/// shorter than two.
fn intra_list_diversity(movies: &[MovieId], popularity: &PopularityIndex) -> Option<f64> {
    if movies.len() < 2 {
        return None;
    }
    let counts: Vec<f64> = movies
        .iter()
        .map(|&m| popularity.get(m).map_or(1, |e| e.rating_count.max(1)) as f64)
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in counts.iter().enumerate() {
        for b in &counts[i + 1..] {
            total += a.min(*b) / a.max(*b);
            pairs += 1;
        }
    }
    Some(1.0 - total / pairs as f64)
}

/// Mean one-based popularity rank of the list over the number of ranked
/// movies. Unranked movies take the last rank.
fn novelty(movies: &[MovieId], popularity: &PopularityIndex) -> Option<f64> {
    if movies.is_empty() || popularity.is_empty() {
        return None;
    }
    let ranked = popularity.len();
    let rank_sum: usize = movies
        .iter()
        .map(|&m| match popularity.rank(m) {
            usize::MAX => ranked,
            rank => rank + 1,
        })
        .sum();
    Some(rank_sum as f64 / movies.len() as f64 / ranked as f64)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
