use crate::error::{Error, Result};
use crate::model::Location;
use crate::score::{FuzzyTextScorer, ScoreWeights, TextScorer, TrigramTextScorer};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Which text-similarity strategy ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextScorerKind {
    Fuzzy,
    Trigram,
}

impl TextScorerKind {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "fuzzy" => Ok(Self::Fuzzy),
            "trigram" => Ok(Self::Trigram),
            other => Err(Error::Config(format!(
                "TEXT_SCORER must be 'fuzzy' or 'trigram', got '{other}'"
            ))),
        }
    }

    pub fn build(self) -> Arc<dyn TextScorer> {
        match self {
            Self::Fuzzy => Arc::new(FuzzyTextScorer),
            Self::Trigram => Arc::new(TrigramTextScorer),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite connection string for the city store.
    pub database_url: String,

    /// Base URL of the IP-geolocation service.
    pub geoip_api_url: String,

    /// Upstream geolocation timeout in seconds.
    pub geoip_timeout_secs: u64,

    /// API server port.
    pub api_port: u16,

    /// Blend weights for the composite score.
    pub weights: ScoreWeights,

    /// Text-similarity strategy.
    pub text_scorer: TextScorerKind,

    /// Candidate over-fetch bound for one search.
    pub candidate_cap: usize,

    /// Default page size.
    pub page_size: usize,

    /// TTL for the geolocation/filter/state caches, seconds.
    pub cache_ttl_secs: u64,

    /// Location used when a client cannot be geolocated.
    pub default_location: Location,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let weights_name =
            env::var("SCORE_WEIGHTS").unwrap_or_else(|_| "default".to_string());
        let weights = ScoreWeights::from_name(&weights_name).ok_or_else(|| {
            Error::Config(format!(
                "SCORE_WEIGHTS must be 'default' or 'legacy', got '{weights_name}'"
            ))
        })?;

        let scorer_name = env::var("TEXT_SCORER").unwrap_or_else(|_| "fuzzy".to_string());
        let text_scorer = TextScorerKind::parse(&scorer_name)?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/cities.db".to_string()),

            geoip_api_url: env::var("GEOIP_API_URL")
                .unwrap_or_else(|_| "http://ip-api.com/json".to_string()),

            geoip_timeout_secs: env::var("GEOIP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),

            api_port: env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),

            weights,

            text_scorer,

            candidate_cap: env::var("CANDIDATE_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),

            page_size: env::var("PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86_400), // 24 hours

            default_location: Location::new(
                env::var("DEFAULT_LATITUDE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(40.7128),
                env::var("DEFAULT_LONGITUDE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(-74.0060),
            ),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn geoip_timeout(&self) -> Duration {
        Duration::from_secs(self.geoip_timeout_secs)
    }

    /// Create a test configuration.
    pub fn test() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            geoip_api_url: "http://localhost:8080".to_string(),
            geoip_timeout_secs: 1,
            api_port: 3000,
            weights: ScoreWeights::DEFAULT,
            text_scorer: TextScorerKind::Fuzzy,
            candidate_cap: 500,
            page_size: 10,
            cache_ttl_secs: 86_400,
            default_location: Location::new(40.7128, -74.0060),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::test();
        assert_eq!(config.api_port, 3000);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.weights, ScoreWeights::DEFAULT);
        assert_eq!(config.cache_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_scorer_kind_parse() {
        assert_eq!(TextScorerKind::parse("fuzzy").unwrap(), TextScorerKind::Fuzzy);
        assert_eq!(
            TextScorerKind::parse("trigram").unwrap(),
            TextScorerKind::Trigram
        );
        assert!(TextScorerKind::parse("bm25").is_err());
    }
}
