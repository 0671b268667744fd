//! Bounded, order-preserving metadata fan-out for ranked lists.

use crate::provider::MetadataProvider;
use crate::types::{Enrichment, EnrichmentWarning, MovieDetails};
use data_loader::ImdbId;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Attaches details to ranked identifiers without ever dropping or
/// reordering them.
///
/// At most `concurrency` calls are in flight at once and each call is cut
/// off after `timeout`; a movie whose call fails, times out or finds nothing
/// gets [`MovieDetails::placeholder`].
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn MetadataProvider>,
    timeout: Duration,
    concurrency: usize,
}

impl Enricher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self, ids), fields(provider = self.provider.name(), count = ids.len()))]
    pub async fn enrich(&self, ids: &[ImdbId]) -> Enrichment {
        let results: Vec<(MovieDetails, Option<EnrichmentWarning>)> = stream::iter(ids)
            .map(|id| self.fetch_one(id))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut enrichment = Enrichment::default();
        for (details, warning) in results {
            enrichment.details.push(details);
            enrichment.warnings.extend(warning);
        }
        if !enrichment.warnings.is_empty() {
            warn!(
                degraded = enrichment.warnings.len(),
                total = ids.len(),
                "Some movies are shown without metadata"
            );
        }
        enrichment
    }

    async fn fetch_one(&self, id: &ImdbId) -> (MovieDetails, Option<EnrichmentWarning>) {
        match timeout(self.timeout, self.provider.fetch_details(id)).await {
            Ok(Ok(Some(details))) => (details, None),
            Ok(Ok(None)) => {
                debug!(imdb_id = %id, "No metadata for movie");
                (MovieDetails::placeholder(), None)
            }
            Ok(Err(e)) => {
                warn!(imdb_id = %id, error = %e, "Metadata fetch failed");
                (
                    MovieDetails::placeholder(),
                    Some(EnrichmentWarning::EnrichmentUnavailable(id.clone())),
                )
            }
            Err(_) => {
                warn!(imdb_id = %id, timeout_ms = self.timeout.as_millis() as u64, "Metadata fetch timed out");
                (
                    MovieDetails::placeholder(),
                    Some(EnrichmentWarning::EnrichmentTimeout(id.clone())),
                )
            }
        }
    }
}
