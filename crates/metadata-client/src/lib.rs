//! Movie metadata enrichment.
//!
//! Ranking never waits on this crate: callers rank first, then hand the
//! ranked identifiers to an [`Enricher`], which fetches display details from
//! a [`MetadataProvider`] (the OMDb API in production) with a per-call
//! timeout and bounded concurrency. Failures degrade to placeholder details
//! plus an [`EnrichmentWarning`]; the ranked list itself is never altered.

pub mod enricher;
pub mod error;
pub mod omdb;
pub mod provider;
pub mod types;

pub use enricher::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, Enricher};
pub use error::{MetadataError, Result};
pub use omdb::OmdbClient;
pub use provider::MetadataProvider;
pub use types::{Enrichment, EnrichmentWarning, MovieDetails};
