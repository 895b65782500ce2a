use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    config::Config,
    error::AppResult,
    models::{
        AbAssignment, ItemDetail, RecommendationPage, RecommendationQuery, SearchPage,
        SearchQuery, SearchSpec, SessionContext, StatsSnapshot,
    },
    services::providers::DiscoveryApi,
};

use super::{
    generation::{Generation, QueryKind, RequestGenerations},
    ControllerEvent,
};

/// Successful response body of one fetch
#[derive(Debug)]
pub enum FetchPayload {
    Recommendations(RecommendationPage),
    Search { query: String, page: SearchPage },
    Stats(StatsSnapshot),
    AbArm(AbAssignment),
    ItemDetail(ItemDetail),
}

/// A settled fetch, tagged with the generation it was dispatched under
#[derive(Debug)]
pub struct FetchOutcome {
    pub kind: QueryKind,
    pub generation: Generation,
    pub result: AppResult<FetchPayload>,
}

/// Issues remote queries as spawned tasks and decides which responses are still current
///
/// Every dispatch validates its inputs first; a skipped dispatch consumes no generation.
/// Superseded requests are not cancelled, their responses are simply ignored on arrival.
pub struct FetchOrchestrator {
    api: Arc<dyn DiscoveryApi>,
    generations: RequestGenerations,
    events: mpsc::UnboundedSender<ControllerEvent>,
    recommendation_count: u32,
    search_limit: u32,
}

impl FetchOrchestrator {
    pub fn new(
        api: Arc<dyn DiscoveryApi>,
        events: mpsc::UnboundedSender<ControllerEvent>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            generations: RequestGenerations::new(),
            events,
            recommendation_count: config.recommendation_count,
            search_limit: config.search_limit,
        }
    }

    pub fn recommendations(&mut self, session: &SessionContext) -> Option<Generation> {
        let Some(user_id) = session.user() else {
            tracing::debug!("Skipping recommendations fetch: empty user id");
            return None;
        };

        let query = RecommendationQuery {
            user_id: user_id.to_string(),
            n: self.recommendation_count,
            content_type: session.content_type().map(str::to_string),
        };

        Some(self.spawn(QueryKind::Recommendations, move |api| async move {
            api.recommend(&query)
                .await
                .map(FetchPayload::Recommendations)
        }))
    }

    pub fn search(&mut self, session: &SessionContext, spec: &SearchSpec) -> Option<Generation> {
        if spec.query.trim().is_empty() {
            tracing::debug!("Skipping search fetch: empty query");
            return None;
        }

        let query = SearchQuery {
            q: spec.query.clone(),
            search_type: spec.search_type,
            limit: self.search_limit,
            user_id: session.user().map(str::to_string),
            content_type: session.content_type().map(str::to_string),
        };

        Some(self.spawn(QueryKind::Search, move |api| async move {
            let page = api.search(&query).await?;
            Ok(FetchPayload::Search {
                query: query.q,
                page,
            })
        }))
    }

    pub fn stats(&mut self) -> Generation {
        self.spawn(QueryKind::Stats, |api| async move {
            api.stats().await.map(FetchPayload::Stats)
        })
    }

    pub fn ab_arm(&mut self, session: &SessionContext) -> Option<Generation> {
        let Some(user_id) = session.user() else {
            tracing::debug!("Skipping experiment arm fetch: empty user id");
            return None;
        };
        let user_id = user_id.to_string();

        Some(self.spawn(QueryKind::AbArm, move |api| async move {
            api.ab_arm(&user_id).await.map(FetchPayload::AbArm)
        }))
    }

    pub fn item_detail(&mut self, item_id: &str) -> Option<Generation> {
        if item_id.trim().is_empty() {
            return None;
        }
        let item_id = item_id.to_string();

        Some(self.spawn(QueryKind::ItemDetail, move |api| async move {
            api.item_detail(&item_id).await.map(FetchPayload::ItemDetail)
        }))
    }

    /// Whether a response for `generation` may still be applied
    pub fn is_current(&self, kind: QueryKind, generation: Generation) -> bool {
        self.generations.is_current(kind, generation)
    }

    pub fn generation(&self, kind: QueryKind) -> Generation {
        self.generations.current(kind)
    }

    fn spawn<F, Fut>(&mut self, kind: QueryKind, call: F) -> Generation
    where
        F: FnOnce(Arc<dyn DiscoveryApi>) -> Fut,
        Fut: Future<Output = AppResult<FetchPayload>> + Send + 'static,
    {
        let generation = self.generations.advance(kind);
        let events = self.events.clone();
        let request = call(self.api.clone());

        tracing::debug!(
            kind = %kind,
            generation = generation.0,
            "Dispatching fetch"
        );

        tokio::spawn(async move {
            let result = request.await;
            let outcome = FetchOutcome {
                kind,
                generation,
                result,
            };
            if events.send(ControllerEvent::Fetched(outcome)).is_err() {
                tracing::debug!(kind = %kind, "Controller gone, dropping response");
            }
        });

        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::test_support::{recommendation_page, search_page};
    use crate::models::SearchType;
    use crate::services::providers::MockDiscoveryApi;
    use tokio::sync::mpsc::error::TryRecvError;

    fn orchestrator(
        mock: MockDiscoveryApi,
    ) -> (FetchOrchestrator, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config::default();
        (FetchOrchestrator::new(Arc::new(mock), tx, &config), rx)
    }

    async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> FetchOutcome {
        match rx.recv().await {
            Some(ControllerEvent::Fetched(outcome)) => outcome,
            other => panic!("expected a fetch outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_user_skips_user_scoped_queries() {
        let (mut orchestrator, mut rx) = orchestrator(MockDiscoveryApi::new());
        let session = SessionContext::new("   ", "");

        assert_eq!(orchestrator.recommendations(&session), None);
        assert_eq!(orchestrator.ab_arm(&session), None);
        assert_eq!(orchestrator.generation(QueryKind::Recommendations), Generation(0));
        assert_eq!(orchestrator.generation(QueryKind::AbArm), Generation(0));

        tokio::task::yield_now().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_recommendation_query_built_from_session_and_config() {
        let mut mock = MockDiscoveryApi::new();
        mock.expect_recommend()
            .withf(|q| {
                q.user_id == "demo_user_1" && q.n == 20 && q.content_type.as_deref() == Some("movie")
            })
            .times(1)
            .returning(|_| Ok(recommendation_page(3, "xgboost_ml")));
        let (mut orchestrator, mut rx) = orchestrator(mock);

        let generation = orchestrator
            .recommendations(&SessionContext::new(" demo_user_1 ", "movie"))
            .unwrap();
        let outcome = next_outcome(&mut rx).await;

        assert_eq!(outcome.kind, QueryKind::Recommendations);
        assert_eq!(outcome.generation, generation);
        assert!(orchestrator.is_current(outcome.kind, outcome.generation));
        match outcome.result {
            Ok(FetchPayload::Recommendations(page)) => assert_eq!(page.recommendations.len(), 3),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_query_carries_optional_user_and_filter() {
        let mut mock = MockDiscoveryApi::new();
        mock.expect_search()
            .withf(|q| {
                q.q == "trending videos"
                    && q.search_type == SearchType::Ai
                    && q.limit == 20
                    && q.user_id.is_none()
                    && q.content_type.is_none()
            })
            .times(1)
            .returning(|_| Ok(search_page(2)));
        let (mut orchestrator, mut rx) = orchestrator(mock);
        let spec = SearchSpec::new("trending videos", SearchType::Ai).unwrap();

        orchestrator.search(&SessionContext::default(), &spec).unwrap();

        match next_outcome(&mut rx).await.result {
            Ok(FetchPayload::Search { query, page }) => {
                assert_eq!(query, "trending videos");
                assert_eq!(page.results.len(), 2);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_superseded_generation_is_not_current() {
        let mut mock = MockDiscoveryApi::new();
        mock.expect_stats()
            .times(2)
            .returning(|| Ok(StatsSnapshot::default()));
        let (mut orchestrator, mut rx) = orchestrator(mock);

        let first = orchestrator.stats();
        let second = orchestrator.stats();
        next_outcome(&mut rx).await;
        next_outcome(&mut rx).await;

        assert!(!orchestrator.is_current(QueryKind::Stats, first));
        assert!(orchestrator.is_current(QueryKind::Stats, second));
    }
}
