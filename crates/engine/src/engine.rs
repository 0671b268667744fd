//! The recommendation engine: the public query interface over the current
//! snapshot.
//!
//! Readers clone the `Arc` of the current snapshot under a short read lock
//! and then work on it without any locking. Installing a new snapshot swaps
//! the pointer; requests already running finish against the old one.

use crate::error::{EngineError, Result};
use crate::scoring;
use crate::snapshot::Snapshot;
use crate::types::{EngineState, Fallback, Outcome, Recommendation, Recommendations, ScoredMovie, Warning};
use data_loader::UserId;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, instrument};

pub struct RecommendationEngine {
    current: RwLock<Arc<Snapshot>>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl RecommendationEngine {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot queries currently run against
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replace the snapshot, returning the previous one
    pub fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        info!(
            movies = next.catalog().len(),
            users = next.users().len(),
            has_model = next.model().is_some(),
            "Installing snapshot"
        );
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    pub fn state(&self) -> EngineState {
        match self.snapshot().model() {
            Some(_) => EngineState::ModelLoaded,
            None => EngineState::NoModel,
        }
    }

    /// Recommend `n` movies for a user of the ratings store.
    ///
    /// Unknown users get the popularity ranking with
    /// [`Fallback::UnknownUser`] (or [`Fallback::NoModelLoaded`] when no model
    /// is installed).
    #[instrument(skip(self))]
    pub fn recommend_for_user(&self, user_id: UserId, n: usize) -> Result<Recommendations> {
        let snapshot = self.snapshot();

        let outcome = match snapshot.users().index_of(user_id) {
            Some(user) => scoring::recommend_for_user(&snapshot, user, n),
            None => {
                let reason = if snapshot.model().is_some() {
                    Fallback::UnknownUser
                } else {
                    Fallback::NoModelLoaded
                };
                Outcome::fallback(scoring::popular(&snapshot, n), reason)
            }
        };
        publish(&snapshot, outcome)
    }

    /// Recommend `n` movies for an ad-hoc list of liked public identifiers.
    ///
    /// Identifiers that do not resolve are reported as
    /// [`Warning::UnknownIdentifier`] and skipped. Order and repetition of
    /// the input do not affect the result.
    #[instrument(skip(self, liked), fields(liked = liked.len()))]
    pub fn recommend_for_profile<S: AsRef<str>>(&self, liked: &[S], n: usize) -> Result<Recommendations> {
        let snapshot = self.snapshot();

        let mut unknown = Vec::new();
        let mut resolved = BTreeSet::new();
        for raw in liked {
            match snapshot.catalog().to_internal(raw.as_ref()) {
                Ok(movie) => {
                    resolved.insert(movie);
                }
                Err(_) => unknown.push(Warning::UnknownIdentifier(raw.as_ref().to_string())),
            }
        }

        let mut outcome = scoring::recommend_for_profile(&snapshot, &resolved, n)?;
        unknown.append(&mut outcome.warnings);
        publish(&snapshot, outcome.with_warnings(unknown))
    }

    /// The popularity ranking, as served to cold-start callers
    pub fn popular(&self, n: usize) -> Result<Recommendations> {
        let snapshot = self.snapshot();
        publish(&snapshot, Outcome::new(scoring::popular(&snapshot, n)))
    }
}

/// Map internal ids to public identifiers; a miss means the snapshot is
/// corrupt and the whole request fails
fn publish(snapshot: &Snapshot, outcome: Outcome<Vec<ScoredMovie>>) -> Result<Recommendations> {
    outcome.try_map(|scored| {
        scored
            .into_iter()
            .map(|s| {
                let imdb_id = snapshot.catalog().to_public(s.movie_id).map_err(|e| {
                    error!(movie_id = s.movie_id, "Ranked movie has no public identifier");
                    EngineError::InvariantViolation(e.to_string())
                })?;
                Ok(Recommendation {
                    imdb_id: imdb_id.clone(),
                    movie_id: s.movie_id,
                    score: s.score,
                })
            })
            .collect::<Result<Vec<_>>>()
    })
}
