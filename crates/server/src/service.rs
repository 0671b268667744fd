//! # Recommendation Service
//!
//! Serves one request end to end:
//! 1. Rank on a blocking thread against the current engine snapshot
//! 2. Enrich the ranked identifiers with display metadata
//! 3. Attach a caller-facing message explaining any fallback
//!
//! Ranking is finished before enrichment starts, so a slow or failing
//! metadata service can only ever degrade details, never the ranking.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::ServerConfig;
use data_loader::{ImdbId, UserId};
use engine::{Fallback, RecommendationEngine, Recommendations, Warning};
use metadata_client::{Enricher, EnrichmentWarning, MetadataProvider, MovieDetails, OmdbClient};

/// One ranked movie with its display details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieRecommendation {
    pub imdb_id: ImdbId,
    pub score: f32,
    #[serde(flatten)]
    pub details: MovieDetails,
}

/// Everything a caller gets back for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub movies: Vec<MovieRecommendation>,
    pub message: String,
    pub fallback: Option<Fallback>,
    pub warnings: Vec<Warning>,
    pub enrichment_warnings: Vec<EnrichmentWarning>,
}

#[derive(Clone)]
pub struct RecommendationService {
    engine: Arc<RecommendationEngine>,
    enricher: Option<Enricher>,
}

impl RecommendationService {
    /// Without an enricher every movie is served with placeholder details
    pub fn new(engine: Arc<RecommendationEngine>, enricher: Option<Enricher>) -> Self {
        Self { engine, enricher }
    }

    /// Wire up OMDb enrichment from configuration when an API key is set
    pub fn from_config(config: &ServerConfig, engine: Arc<RecommendationEngine>) -> Self {
        let enricher = config.omdb_api_key().map(|key| {
            let provider: Arc<dyn MetadataProvider> =
                Arc::new(OmdbClient::new(key, config.omdb_api_url.clone()));
            Enricher::new(provider)
                .with_timeout(config.enrich_timeout())
                .with_concurrency(config.enrich_concurrency)
        });
        if enricher.is_none() {
            info!("No OMDb API key configured, serving placeholder metadata");
        }
        Self::new(engine, enricher)
    }

    pub fn engine(&self) -> &Arc<RecommendationEngine> {
        &self.engine
    }

    pub async fn recommend_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<RecommendationResponse> {
        let start_time = Instant::now();

        let outcome = self
            .rank(move |engine| engine.recommend_for_user(user_id, limit))
            .await
            .with_context(|| format!("Failed to rank movies for user {}", user_id))?;
        let message = user_message(&outcome);
        let response = self.respond(outcome, message).await;

        info!(
            user_id,
            returned = response.movies.len(),
            fallback = ?response.fallback,
            elapsed = ?start_time.elapsed(),
            "Served user recommendations"
        );
        Ok(response)
    }

    pub async fn recommend_for_profile(
        &self,
        liked: Vec<String>,
        limit: usize,
    ) -> Result<RecommendationResponse> {
        let start_time = Instant::now();
        let provided = liked.len();

        let outcome = self
            .rank(move |engine| engine.recommend_for_profile(&liked, limit))
            .await
            .context("Failed to rank movies for profile")?;
        let message = profile_message(provided, &outcome);
        let response = self.respond(outcome, message).await;

        info!(
            liked = provided,
            returned = response.movies.len(),
            warnings = response.warnings.len(),
            fallback = ?response.fallback,
            elapsed = ?start_time.elapsed(),
            "Served profile recommendations"
        );
        Ok(response)
    }

    pub async fn popular(&self, limit: usize) -> Result<RecommendationResponse> {
        let outcome = self
            .rank(move |engine| engine.popular(limit))
            .await
            .context("Failed to rank popular movies")?;
        let message = format!("Showing the {} most popular movies.", outcome.value.len());
        Ok(self.respond(outcome, message).await)
    }

    async fn rank<F>(&self, query: F) -> Result<Recommendations>
    where
        F: FnOnce(&RecommendationEngine) -> engine::Result<Recommendations> + Send + 'static,
    {
        let engine = self.engine.clone();
        let outcome = tokio::task::spawn_blocking(move || query(&engine))
            .await
            .context("Ranking task panicked")??;
        Ok(outcome)
    }

    async fn respond(&self, outcome: Recommendations, message: String) -> RecommendationResponse {
        let ids: Vec<ImdbId> = outcome.value.iter().map(|r| r.imdb_id.clone()).collect();
        let (details, enrichment_warnings) = match &self.enricher {
            Some(enricher) => {
                let enrichment = enricher.enrich(&ids).await;
                (enrichment.details, enrichment.warnings)
            }
            None => (vec![MovieDetails::placeholder(); ids.len()], Vec::new()),
        };

        let movies = outcome
            .value
            .into_iter()
            .zip(details)
            .map(|(rec, details)| MovieRecommendation {
                imdb_id: rec.imdb_id,
                score: rec.score,
                details,
            })
            .collect();

        RecommendationResponse {
            movies,
            message,
            fallback: outcome.fallback,
            warnings: outcome.warnings,
            enrichment_warnings,
        }
    }
}

const MODEL_LOADING: &str = "Recommender model is still loading. Popular movies returned instead.";

fn user_message(outcome: &Recommendations) -> String {
    match outcome.fallback {
        Some(Fallback::NoModelLoaded) => MODEL_LOADING.to_string(),
        Some(Fallback::UnknownUser) => {
            "You're a new user! Try rating some movies to get personalized recommendations."
                .to_string()
        }
        Some(Fallback::ColdUser | Fallback::EmptyProfileAfterFiltering) => {
            "Not enough rating history yet. Showing popular movies instead.".to_string()
        }
        None if outcome.value.is_empty() => {
            "You've rated every movie we could recommend.".to_string()
        }
        None => format!(
            "Generated {} personalized recommendations based on your rating history.",
            outcome.value.len()
        ),
    }
}

fn profile_message(provided: usize, outcome: &Recommendations) -> String {
    match outcome.fallback {
        Some(Fallback::NoModelLoaded) => MODEL_LOADING.to_string(),
        Some(_) if provided == 0 => {
            "No movies provided in your profile. Showing popular movies instead.".to_string()
        }
        Some(_)
            if outcome
                .warnings
                .iter()
                .all(|w| matches!(w, Warning::UnknownIdentifier(_))) =>
        {
            "None of your liked movies were found in our database. Showing popular movies instead."
                .to_string()
        }
        Some(_) => {
            "None of your liked movies could be used for recommendations. Showing popular movies instead."
                .to_string()
        }
        None => format!(
            "Generated {} recommendations based on your movie profile.",
            outcome.value.len()
        ),
    }
}
