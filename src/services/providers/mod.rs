//! Recommendation service abstraction
//!
//! The controller talks to the backend only through [`DiscoveryApi`], so tests can swap in
//! mocks and the HTTP transport stays in one place.

use crate::{
    error::AppResult,
    models::{
        AbAssignment, HealthStatus, InteractionEvent, ItemDetail, RecommendationPage,
        RecommendationQuery, SearchPage, SearchQuery, StatsSnapshot,
    },
};

pub mod http;

pub use http::HttpDiscoveryApi;

/// Remote calls the controller depends on
///
/// Implementations must be cheap to share: the controller holds one behind an `Arc` and
/// calls it from spawned tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DiscoveryApi: Send + Sync {
    /// Personalised recommendations for a user
    async fn recommend(&self, query: &RecommendationQuery) -> AppResult<RecommendationPage>;

    /// Query-driven search, simple keyword or AI mode
    async fn search(&self, query: &SearchQuery) -> AppResult<SearchPage>;

    /// Aggregate service counters
    async fn stats(&self) -> AppResult<StatsSnapshot>;

    /// Experiment arm for a user
    async fn ab_arm(&self, user_id: &str) -> AppResult<AbAssignment>;

    /// Item with similar items, for the detail panel
    async fn item_detail(&self, item_id: &str) -> AppResult<ItemDetail>;

    /// Post one interaction event; any 2xx is success
    async fn post_event(&self, event: &InteractionEvent) -> AppResult<()>;

    /// Backend liveness
    async fn health(&self) -> AppResult<HealthStatus>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
