//! Runtime configuration, loaded from the environment via figment.
//!
//! Every field has a default so the service starts with no environment at all;
//! branches whose credentials are missing simply degrade to their empty values.

use custom_debug_derive::Debug;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const CONFIG_FILE: &str = "wikicap.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base level for the `wikicap` target when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub spotify_client_id: String,
    #[debug(skip)]
    #[serde(default)]
    pub spotify_client_secret: String,
    #[debug(skip)]
    #[serde(default)]
    pub tmdb_api_key: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout applied to every outbound HTTP client.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
    /// Upper bound for the whole events branch (TOC + all month sections).
    #[serde(
        default = "default_events_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub events_timeout: Duration,
    /// Upper bound for any single branch of the composite year response.
    #[serde(
        default = "default_branch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub branch_timeout: Duration,
    #[serde(default = "default_cache_ttl", deserialize_with = "deserialize_duration")]
    pub cache_ttl: Duration,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Maximum in-flight metadata lookups per enrichment batch.
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load from an optional `wikicap.toml`, overridden by raw environment variables
    /// (`PORT`, `SPOTIFY_CLIENT_ID`, ...).
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            port: default_port(),
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            tmdb_api_key: String::new(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            events_timeout: default_events_timeout(),
            branch_timeout: default_branch_timeout(),
            cache_ttl: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            enrichment_concurrency: default_enrichment_concurrency(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_user_agent() -> String {
    concat!(
        "WikiCap/",
        env!("CARGO_PKG_VERSION"),
        " (https://github.com/WikiCap/year-overview)"
    )
    .to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_events_timeout() -> Duration {
    Duration::from_secs(12)
}

fn default_branch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(12 * 60 * 60)
}

fn default_cache_capacity() -> usize {
    200
}

fn default_enrichment_concurrency() -> usize {
    4
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Accepts either a bare number of seconds or a human string like `"12h"` / `"1500ms"`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_duration(text: &str) -> Result<Duration, String> {
    let parser = fundu::DurationParser::with_all_time_units();
    let parsed = parser
        .parse(text.trim())
        .map_err(|e| format!("invalid duration {text:?}: {e}"))?;
    parsed
        .try_into()
        .map_err(|e| format!("duration {text:?} out of range: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43_200));
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" 30s ").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_capacity, 200);
        assert_eq!(config.enrichment_concurrency, 4);
        assert_eq!(config.cache_ttl, Duration::from_secs(12 * 3600));
    }

    #[test]
    fn test_toml_values_and_durations() {
        let config: Config = Figment::from(Toml::string(
            r#"
            port = 9000
            cache_ttl = "30m"
            branch_timeout = 45
            tmdb_api_key = "abc"
            "#,
        ))
        .extract()
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.branch_timeout, Duration::from_secs(45));
        assert_eq!(config.tmdb_api_key, "abc");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config {
            spotify_client_secret: "hunter2".to_string(),
            tmdb_api_key: "tmdb-key".to_string(),
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tmdb-key"));
    }
}
