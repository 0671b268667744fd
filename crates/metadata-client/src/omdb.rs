//! OMDb API provider
//!
//! Looks up one movie per call with `GET {api_url}?i={imdb_id}&apikey={key}`.
//! OMDb reports lookup failures in-band (`"Response": "False"`) and writes
//! `"N/A"` for fields it has no value for.

use crate::error::{MetadataError, Result};
use crate::provider::MetadataProvider;
use crate::types::MovieDetails;
use data_loader::ImdbId;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "http://www.omdbapi.com/";

#[derive(Clone)]
pub struct OmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OmdbClient {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
}

/// OMDb's in-band "no such movie" messages
const NOT_FOUND_ERRORS: &[&str] = &["Movie not found!", "Incorrect IMDb ID."];

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "N/A")
}

fn into_details(body: OmdbResponse) -> Result<Option<MovieDetails>> {
    if body.response != "True" {
        let message = body.error.unwrap_or_else(|| "Unknown error".to_string());
        if NOT_FOUND_ERRORS.contains(&message.as_str()) {
            return Ok(None);
        }
        return Err(MetadataError::Api(message));
    }

    let Some(title) = present(body.title) else {
        return Ok(None);
    };
    Ok(Some(MovieDetails {
        title,
        year: present(body.year),
        poster_url: present(body.poster),
        plot: present(body.plot),
        rating: present(body.imdb_rating).and_then(|r| r.parse().ok()),
    }))
}

/// Parse a raw OMDb response body
pub fn parse_response(body: &str) -> Result<Option<MovieDetails>> {
    into_details(serde_json::from_str(body)?)
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbClient {
    async fn fetch_details(&self, imdb_id: &ImdbId) -> Result<Option<MovieDetails>> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("i", imdb_id.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(imdb_id = %imdb_id, status = status.as_u16(), "OMDb request failed");
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let details = parse_response(&response.text().await?)?;
        if details.is_none() {
            debug!(imdb_id = %imdb_id, "OMDb has no entry for movie");
        }
        Ok(details)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
