use serde::Deserialize;
use std::time::Duration;

/// Controller configuration loaded from `DISCOVERY_*` environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the recommendation service (without the `/api` suffix)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User id the session starts with
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Content-type filter the session starts with (empty = no filter)
    #[serde(default)]
    pub content_type: String,

    /// Number of recommendations requested per fetch
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: u32,

    /// Maximum number of search results requested
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Stats polling cadence in seconds
    #[serde(default = "default_stats_poll_secs")]
    pub stats_poll_secs: u64,

    /// How long a toast stays fully visible, in milliseconds
    #[serde(default = "default_notification_visible_ms")]
    pub notification_visible_ms: u64,
}

fn default_api_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_user_id() -> String {
    "demo_user_1".to_string()
}

fn default_recommendation_count() -> u32 {
    20
}

fn default_search_limit() -> u32 {
    20
}

fn default_stats_poll_secs() -> u64 {
    30
}

fn default_notification_visible_ms() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_id: default_user_id(),
            content_type: String::new(),
            recommendation_count: default_recommendation_count(),
            search_limit: default_search_limit(),
            stats_poll_secs: default_stats_poll_secs(),
            notification_visible_ms: default_notification_visible_ms(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::prefixed("DISCOVERY_")
            .from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the controller cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stats_poll_secs == 0 {
            anyhow::bail!("DISCOVERY_STATS_POLL_SECS must be at least 1");
        }
        if self.recommendation_count == 0 {
            anyhow::bail!("DISCOVERY_RECOMMENDATION_COUNT must be at least 1");
        }
        if self.search_limit == 0 {
            anyhow::bail!("DISCOVERY_SEARCH_LIMIT must be at least 1");
        }
        Ok(())
    }

    pub fn stats_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stats_poll_secs)
    }

    pub fn notification_visible(&self) -> Duration {
        Duration::from_millis(self.notification_visible_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_variables() {
        let vars: Vec<(String, String)> = vec![];
        let config: Config = envy::prefixed("DISCOVERY_").from_iter(vars).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.stats_poll_interval(), Duration::from_secs(30));
        assert_eq!(config.recommendation_count, 20);
    }

    #[test]
    fn test_overrides_from_prefixed_variables() {
        let vars = vec![
            (
                "DISCOVERY_API_URL".to_string(),
                "http://recs.internal:9000".to_string(),
            ),
            ("DISCOVERY_USER_ID".to_string(), "alice".to_string()),
            ("DISCOVERY_CONTENT_TYPE".to_string(), "movie".to_string()),
            ("DISCOVERY_STATS_POLL_SECS".to_string(), "5".to_string()),
        ];
        let config: Config = envy::prefixed("DISCOVERY_").from_iter(vars).unwrap();
        assert_eq!(config.api_url, "http://recs.internal:9000");
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.content_type, "movie");
        assert_eq!(config.stats_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.search_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let vars = vec![("DISCOVERY_STATS_POLL_SECS".to_string(), "0".to_string())];
        let config: Config = envy::prefixed("DISCOVERY_").from_iter(vars).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DISCOVERY_STATS_POLL_SECS"), "{}", err);
    }

    #[test]
    fn test_zero_counts_are_rejected() {
        let config = Config {
            search_limit: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
