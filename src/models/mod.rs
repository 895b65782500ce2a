use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub mod interaction;
pub mod item;
pub mod session;

pub use interaction::{InteractionEvent, InteractionType};
pub use item::{ItemDetail, ResultItem, ResultSet};
pub use session::{SearchSpec, SearchType, SessionContext};

/// One of the two result contexts the view can display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Recommendations,
    Search,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Recommendations => "recommendations",
            Tab::Search => "search",
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Parameters for `GET /api/recommend`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationQuery {
    pub user_id: String,
    pub n: u32,
    pub content_type: Option<String>,
}

impl RecommendationQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("user_id", self.user_id.clone()), ("n", self.n.to_string())];
        if let Some(content_type) = &self.content_type {
            params.push(("content_type", content_type.clone()));
        }
        params
    }
}

/// Parameters for `GET /api/search`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub search_type: SearchType,
    pub limit: u32,
    pub user_id: Option<String>,
    pub content_type: Option<String>,
}

impl SearchQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.q.clone()),
            ("search_type", self.search_type.as_str().to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(user_id) = &self.user_id {
            params.push(("user_id", user_id.clone()));
        }
        if let Some(content_type) = &self.content_type {
            params.push(("content_type", content_type.clone()));
        }
        params
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Response from `GET /api/recommend`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationPage {
    pub recommendations: Vec<ResultItem>,
    pub algorithm: String,
}

/// Response from `GET /api/search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub results: Vec<ResultItem>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub search_type: Option<SearchType>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// Aggregate service counters shown in the stats tiles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StatsSnapshot {
    pub total_users: u64,
    pub total_items: u64,
    pub total_interactions: u64,
    pub active_users_24h: u64,
    pub interactions_24h: u64,
    pub items_by_type: BTreeMap<String, u64>,
    pub popular_categories: Vec<CategoryActivity>,
}

/// Interaction volume for one category over the last week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryActivity {
    #[serde(rename = "_id", alias = "category", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub interaction_count: u64,
}

/// Response envelope from `GET /api/stats`
#[derive(Debug, Clone, Deserialize)]
pub struct StatsEnvelope {
    pub statistics: StatsSnapshot,
}

/// Experiment bucket the current user falls into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbAssignment {
    pub arm: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub experiment_name: String,
    #[serde(default)]
    pub experiment_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_utc")]
    pub timestamp: DateTime<Utc>,
}

/// Response from `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, bool>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Accepts RFC 3339 timestamps as well as naive ones, which are taken as UTC
fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
