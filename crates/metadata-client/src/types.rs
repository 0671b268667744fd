use data_loader::ImdbId;
use serde::{Deserialize, Serialize};

/// Display metadata for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
    pub plot: Option<String>,
    /// Critic rating on a 0-10 scale
    pub rating: Option<f32>,
}

impl MovieDetails {
    pub const PLACEHOLDER_TITLE: &'static str = "Title unavailable";

    /// Neutral details used when nothing could be fetched
    pub fn placeholder() -> Self {
        Self {
            title: Self::PLACEHOLDER_TITLE.to_string(),
            year: None,
            poster_url: None,
            plot: None,
            rating: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.title == Self::PLACEHOLDER_TITLE
            && self.year.is_none()
            && self.poster_url.is_none()
            && self.plot.is_none()
            && self.rating.is_none()
    }
}

/// Why a movie is shown with placeholder details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EnrichmentWarning {
    /// The call did not finish within the per-call timeout
    EnrichmentTimeout(ImdbId),
    /// The service failed or rejected the call
    EnrichmentUnavailable(ImdbId),
}

/// Details for a ranked list, aligned index by index with the input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub details: Vec<MovieDetails>,
    pub warnings: Vec<EnrichmentWarning>,
}
