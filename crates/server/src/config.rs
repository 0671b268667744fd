use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable prefix for every setting, e.g. `MARQUEE_MODEL_PATH`
pub const ENV_PREFIX: &str = "MARQUEE_";

/// Service configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Snapshot file produced by `marquee train`
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// MovieLens directory used to serve popularity when no snapshot exists yet
    pub data_dir: Option<PathBuf>,

    /// OMDb API key; enrichment is disabled without one
    pub omdb_api_key: Option<String>,

    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    #[serde(default = "default_enrich_timeout_ms")]
    pub enrich_timeout_ms: u64,

    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Seconds between snapshot file checks; 0 disables hot reload
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/snapshot.json")
}

fn default_omdb_api_url() -> String {
    metadata_client::omdb::DEFAULT_API_URL.to_string()
}

fn default_enrich_timeout_ms() -> u64 {
    3000
}

fn default_enrich_concurrency() -> usize {
    8
}

fn default_reload_interval_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info,server=debug,engine=debug".to_string()
}

impl ServerConfig {
    /// Load configuration from the environment, after reading `.env` if present
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<ServerConfig>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_pairs<I>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, ServerConfig>(pairs)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_millis(self.enrich_timeout_ms)
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }

    /// The OMDb key, ignoring blank values
    pub fn omdb_api_key(&self) -> Option<&str> {
        self.omdb_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_pairs(pairs(&[])).unwrap();

        assert_eq!(config.model_path, PathBuf::from("models/snapshot.json"));
        assert_eq!(config.data_dir, None);
        assert_eq!(config.omdb_api_key(), None);
        assert_eq!(config.enrich_timeout(), Duration::from_secs(3));
        assert_eq!(config.enrich_concurrency, 8);
        assert_eq!(config.reload_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = ServerConfig::from_pairs(pairs(&[
            ("MARQUEE_MODEL_PATH", "/srv/marquee/snapshot.json"),
            ("MARQUEE_DATA_DIR", "/srv/ml-latest-small"),
            ("MARQUEE_OMDB_API_KEY", "abc123"),
            ("MARQUEE_ENRICH_TIMEOUT_MS", "250"),
            ("MARQUEE_RELOAD_INTERVAL_SECS", "0"),
            ("MODEL_PATH", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/srv/marquee/snapshot.json"));
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/ml-latest-small")));
        assert_eq!(config.omdb_api_key(), Some("abc123"));
        assert_eq!(config.enrich_timeout(), Duration::from_millis(250));
        assert_eq!(config.reload_interval(), None);
    }

    #[test]
    fn test_blank_api_key_disables_enrichment() {
        let config = ServerConfig::from_pairs(pairs(&[("MARQUEE_OMDB_API_KEY", "  ")])).unwrap();
        assert_eq!(config.omdb_api_key(), None);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let result = ServerConfig::from_pairs(pairs(&[("MARQUEE_ENRICH_CONCURRENCY", "many")]));
        assert!(result.is_err());
    }
}
