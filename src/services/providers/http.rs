//! JSON-over-HTTP client for the recommendation service
//!
//! Every endpoint lives under `{api_url}/api/`. Non-2xx responses become
//! [`AppError::ExternalApi`] carrying the status (and the backend's `detail`, if any);
//! the raw body is only logged. Transport failures surface as [`AppError::HttpClient`].

use crate::{
    error::{AppError, AppResult},
    models::{
        AbAssignment, HealthStatus, InteractionEvent, ItemDetail, RecommendationPage,
        RecommendationQuery, SearchPage, SearchQuery, StatsEnvelope, StatsSnapshot,
    },
    services::{
        providers::DiscoveryApi,
        request_id::{make_span_with_request_id, RequestId, REQUEST_ID_HEADER},
    },
};
use reqwest::{Client as HttpClient, IntoUrl, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::Instrument;

#[derive(Clone)]
pub struct HttpDiscoveryApi {
    http_client: HttpClient,
    api_url: String,
}

impl HttpDiscoveryApi {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), api_url)
    }

    pub fn with_client(http_client: HttpClient, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            api_url,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.api_url, path)
    }

    /// `item/{item_id}` with the id pushed as one percent-encoded path segment
    fn item_url(&self, item_id: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.endpoint("item"))
            .map_err(|e| AppError::Internal(format!("Invalid API URL {}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("API URL {} cannot take a path", self.api_url)))?
            .push(item_id);
        Ok(url)
    }

    /// Sends a request tagged with a fresh request ID and rejects non-2xx responses
    async fn send(&self, method: &str, path: &str, request: RequestBuilder) -> AppResult<Response> {
        let request_id = RequestId::new();
        let span = make_span_with_request_id(method, path, &request_id);

        async move {
            let response = request
                .header(REQUEST_ID_HEADER, request_id.as_str())
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = %status, body = %body, "Recommendation service returned an error");
                return Err(AppError::ExternalApi(status_message(path, status, &body)));
            }

            tracing::debug!(status = %response.status(), "Request completed");
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> AppResult<T> {
        self.get_json_from(path, self.endpoint(path), params).await
    }

    async fn get_json_from<T: DeserializeOwned, U: IntoUrl>(
        &self,
        path: &str,
        url: U,
        params: &[(&'static str, String)],
    ) -> AppResult<T> {
        let request = self.http_client.get(url).query(params);
        let response = self.send("GET", path, request).await?;
        Ok(response.json().await?)
    }
}

/// Banner-safe summary of a non-2xx response
fn status_message(path: &str, status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail")?.as_str().map(str::to_string));

    match detail {
        Some(detail) => format!("{} returned status {}: {}", path, status, detail),
        None => format!("{} returned status {}", path, status),
    }
}

#[async_trait::async_trait]
impl DiscoveryApi for HttpDiscoveryApi {
    async fn recommend(&self, query: &RecommendationQuery) -> AppResult<RecommendationPage> {
        let page: RecommendationPage = self.get_json("recommend", &query.to_params()).await?;

        tracing::info!(
            user_id = %query.user_id,
            algorithm = %page.algorithm,
            results = page.recommendations.len(),
            "Recommendations fetched"
        );

        Ok(page)
    }

    async fn search(&self, query: &SearchQuery) -> AppResult<SearchPage> {
        if query.q.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let page: SearchPage = self.get_json("search", &query.to_params()).await?;

        tracing::info!(
            query = %query.q,
            search_type = query.search_type.as_str(),
            results = page.results.len(),
            "Search completed"
        );

        Ok(page)
    }

    async fn stats(&self) -> AppResult<StatsSnapshot> {
        let envelope: StatsEnvelope = self.get_json("stats", &[]).await?;
        Ok(envelope.statistics)
    }

    async fn ab_arm(&self, user_id: &str) -> AppResult<AbAssignment> {
        self.get_json("ab/arm", &[("user_id", user_id.to_string())])
            .await
    }

    async fn item_detail(&self, item_id: &str) -> AppResult<ItemDetail> {
        if item_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Item id cannot be empty".to_string()));
        }
        let url = self.item_url(item_id)?;
        self.get_json_from("item", url, &[]).await
    }

    async fn post_event(&self, event: &InteractionEvent) -> AppResult<()> {
        let request = self.http_client.post(self.endpoint("event")).json(event);
        self.send("POST", "event", request).await?;

        tracing::debug!(
            item_id = %event.item_id,
            interaction = %event.interaction_type,
            "Interaction event accepted"
        );

        Ok(())
    }

    async fn health(&self) -> AppResult<HealthStatus> {
        self.get_json("health", &[]).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
