//! Popularity Index.
//!
//! A precomputed ranking of every rated movie, used whenever personalized
//! scoring is unavailable and as the tie-breaker for personalized scores.
//!
//! The aggregate score is the mean rating shrunk toward zero by a confidence
//! factor on the rating count:
//!
//! ```text
//! score = avg_rating * count / (count + confidence)
//! ```
//!
//! The score grows with both the mean and the count, so a single 5-star
//! rating (5 * 1/26 ~ 0.19) stays far below a 4.3-star movie with thousands
//! of ratings (~4.26).

use crate::types::{MovieId, MovieStats};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Default confidence constant: the rating count at which a movie keeps half
/// of its mean rating as score
pub const DEFAULT_CONFIDENCE: f32 = 25.0;

/// One ranked movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopularityEntry {
    pub movie_id: MovieId,
    pub score: f32,
    pub rating_count: u32,
}

/// Movies ranked by aggregate score.
///
/// Order: score descending, then rating count descending, then movie id
/// ascending. Identical inputs always give the identical order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PopularityEntry>", into = "Vec<PopularityEntry>")]
pub struct PopularityIndex {
    entries: Vec<PopularityEntry>,
    /// Position of each movie in `entries`
    ranks: HashMap<MovieId, usize>,
}

/// Confidence-weighted mean
pub fn popularity_score(avg_rating: f32, rating_count: u32, confidence: f32) -> f32 {
    if rating_count == 0 {
        return 0.0;
    }
    let n = rating_count as f32;
    avg_rating * n / (n + confidence)
}

fn compare_entries(a: &PopularityEntry, b: &PopularityEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.rating_count.cmp(&a.rating_count))
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

impl PopularityIndex {
    pub fn build(stats: &HashMap<MovieId, MovieStats>) -> Self {
        Self::build_with_confidence(stats, DEFAULT_CONFIDENCE)
    }

    pub fn build_with_confidence(stats: &HashMap<MovieId, MovieStats>, confidence: f32) -> Self {
        let entries = stats
            .iter()
            .filter(|(_, s)| s.rating_count > 0)
            .map(|(&movie_id, s)| PopularityEntry {
                movie_id,
                score: popularity_score(s.avg_rating, s.rating_count, confidence),
                rating_count: s.rating_count,
            })
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(mut entries: Vec<PopularityEntry>) -> Self {
        entries.sort_by(compare_entries);
        let ranks = entries
            .iter()
            .enumerate()
            .map(|(rank, e)| (e.movie_id, rank))
            .collect();
        Self { entries, ranks }
    }

    /// The `n` most popular movie ids, best first
    pub fn top(&self, n: usize) -> Vec<MovieId> {
        self.entries.iter().take(n).map(|e| e.movie_id).collect()
    }

    /// The `n` most popular entries, best first
    pub fn top_entries(&self, n: usize) -> &[PopularityEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn exists(&self, movie_id: MovieId) -> bool {
        self.ranks.contains_key(&movie_id)
    }

    /// Zero-based rank; movies not in the index rank after every indexed one
    pub fn rank(&self, movie_id: MovieId) -> usize {
        self.ranks.get(&movie_id).copied().unwrap_or(usize::MAX)
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&PopularityEntry> {
        self.ranks.get(&movie_id).map(|&rank| &self.entries[rank])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<PopularityEntry>> for PopularityIndex {
    fn from(entries: Vec<PopularityEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<PopularityIndex> for Vec<PopularityEntry> {
    fn from(index: PopularityIndex) -> Self {
        index.entries
    }
}
