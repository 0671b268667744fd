use crate::error::Result;
use crate::types::MovieDetails;
use data_loader::ImdbId;

/// Source of display metadata for public movie identifiers.
///
/// `Ok(None)` means the service answered but does not know the movie;
/// `Err` means the service could not answer at all.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_details(&self, imdb_id: &ImdbId) -> Result<Option<MovieDetails>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
