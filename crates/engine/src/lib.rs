//! # Engine Crate
//!
//! Query-time side of the recommender. Holds the current serving
//! [`Snapshot`] (identifier table, user history, popularity ranking and the
//! optional model) and answers:
//!
//! - `recommend_for_user(user_id, n)`: predicted ratings for a known user
//! - `recommend_for_profile(liked_ids, n)`: affinity to an ad-hoc liked set
//! - `popular(n)`: the cold-start ranking
//!
//! ```ignore
//! use engine::{RecommendationEngine, Snapshot};
//!
//! let engine = RecommendationEngine::new(Snapshot::load(Path::new("snapshot.json"))?);
//! let recs = engine.recommend_for_profile(&["tt0114709", "tt0133093"], 10)?;
//! for rec in &recs.value {
//!     println!("{} {:.3}", rec.imdb_id, rec.score);
//! }
//! ```
//!
//! Every path returns something: degradations are reported through
//! [`Outcome::warnings`] and [`Outcome::fallback`], never as errors.

pub mod engine;
pub mod error;
pub mod scoring;
pub mod snapshot;
pub mod types;

pub use engine::RecommendationEngine;
pub use error::{EngineError, Result};
pub use snapshot::Snapshot;
pub use types::{EngineState, Fallback, Outcome, Recommendation, Recommendations, ScoredMovie, Warning};
