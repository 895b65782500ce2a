//! Discovery & interaction controller.
//!
//! The [`Controller`] owns all view state and mutates it only inside its own `&mut self`
//! handlers. Network calls run as spawned tasks that report back over an internal event
//! channel; the controller applies those events one at a time, so the whole state machine
//! runs on one logical thread no matter how many requests are in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppResult,
    models::{InteractionType, SearchSpec, SessionContext},
    services::providers::DiscoveryApi,
};

pub mod discovery;
pub mod emitter;
pub mod generation;
pub mod notifications;
pub mod orchestrator;
pub mod polling;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use discovery::Intent;
pub use generation::{Generation, QueryKind};
pub use notifications::{Notification, NotificationKind, NotificationPhase, NotificationTiming};
pub use state::{DiscoveryState, LoadingFlags, SelectedItem};

use emitter::{settle_message, InteractionEmitter};
use orchestrator::{FetchOrchestrator, FetchOutcome, FetchPayload};
use polling::{PollingHandle, PollingScheduler};

/// Messages delivered to the controller from its own background tasks
#[derive(Debug)]
pub enum ControllerEvent {
    /// A fetch settled
    Fetched(FetchOutcome),
    /// A telemetry post settled
    InteractionSettled {
        item_id: String,
        interaction_type: InteractionType,
        result: AppResult<()>,
    },
    /// A toast reached the end of its lifetime
    NotificationExpired(Uuid),
    /// The stats poll interval elapsed
    StatsTick,
}

pub struct Controller {
    state: Arc<DiscoveryState>,
    snapshots: watch::Sender<Arc<DiscoveryState>>,
    orchestrator: FetchOrchestrator,
    emitter: InteractionEmitter,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    poll_interval: Duration,
    poller: Option<PollingHandle>,
    mounted: bool,
}

impl Controller {
    pub fn new(api: Arc<dyn DiscoveryApi>, config: &Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = SessionContext::new(config.user_id.clone(), config.content_type.clone());
        let timing = NotificationTiming::new(config.notification_visible());
        let state = Arc::new(DiscoveryState::new(session, timing));
        let (snapshots, _) = watch::channel(state.clone());

        Self {
            orchestrator: FetchOrchestrator::new(api.clone(), events_tx.clone(), config),
            emitter: InteractionEmitter::new(api, events_tx.clone()),
            state,
            snapshots,
            events_tx,
            events_rx,
            poll_interval: config.stats_poll_interval(),
            poller: None,
            mounted: false,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<DiscoveryState> {
        self.state.clone()
    }

    /// Snapshot stream for the view layer; a new value is published after every transition
    pub fn subscribe(&self) -> watch::Receiver<Arc<DiscoveryState>> {
        self.snapshots.subscribe()
    }

    /// Latest generation dispatched for `kind`
    pub fn generation(&self, kind: QueryKind) -> Generation {
        self.orchestrator.generation(kind)
    }

    /// Mount effect: initial fetches plus the stats poller
    pub fn mount(&mut self) {
        if self.mounted {
            tracing::debug!("Controller already mounted");
            return;
        }
        self.mounted = true;

        tracing::info!(
            user_id = %self.state.session.user_id,
            poll_secs = self.poll_interval.as_secs(),
            "Mounting discovery controller"
        );

        self.fetch_recommendations();
        self.fetch_ab_arm();
        self.fetch_stats();
        match PollingScheduler::start(self.poll_interval, self.events_tx.clone()) {
            Ok(poller) => self.poller = Some(poller),
            Err(e) => tracing::warn!(error = %e, "Stats polling disabled"),
        }
    }

    /// Stops polling; in-flight responses are dropped along with the controller
    pub async fn teardown(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.shutdown().await;
        }
        tracing::info!("Discovery controller torn down");
    }

    /// Waits for the next background event without applying it
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    /// Waits for one background event and applies it
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Applies every event that is already queued, returning how many were handled
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Fetched(outcome) => self.apply_fetch(outcome),
            ControllerEvent::InteractionSettled {
                item_id,
                interaction_type,
                result,
            } => {
                if let Err(e) = &result {
                    tracing::warn!(
                        item_id = %item_id,
                        interaction = %interaction_type,
                        error = %e,
                        "Interaction event failed"
                    );
                }
                let (message, kind) = settle_message(interaction_type, &result);
                self.notify(message, kind);
            }
            ControllerEvent::NotificationExpired(id) => {
                let next = self.state.with_expired_notifications(id, Instant::now());
                if next.notifications.len() != self.state.notifications.len() {
                    self.replace(next);
                }
            }
            ControllerEvent::StatsTick => self.fetch_stats(),
        }
    }

    /// Drives the controller until the intent channel closes, then tears down
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        enum Input {
            Intent(Option<Intent>),
            Event(Option<ControllerEvent>),
        }

        self.mount();

        loop {
            let input = tokio::select! {
                intent = intents.recv() => Input::Intent(intent),
                event = self.events_rx.recv() => Input::Event(event),
            };

            match input {
                Input::Intent(Some(intent)) => self.dispatch(intent),
                Input::Intent(None) => break,
                Input::Event(Some(event)) => self.handle_event(event),
                Input::Event(None) => break,
            }
        }

        self.teardown().await;
    }

    fn replace(&mut self, next: DiscoveryState) {
        self.state = Arc::new(next);
        self.snapshots.send_replace(self.state.clone());
    }

    fn notify(&mut self, message: String, kind: NotificationKind) {
        let (next, id) = self.state.with_notification(message, kind, Instant::now());
        let lifetime = next.notifications.timing().lifetime();
        self.replace(next);
        notifications::schedule_expiry(self.events_tx.clone(), id, lifetime);
    }

    // ------------------------------------------------------------------
    // Fetch dispatch
    // ------------------------------------------------------------------

    fn fetch_recommendations(&mut self) {
        if self
            .orchestrator
            .recommendations(&self.state.session)
            .is_some()
        {
            let next = self.state.with_dispatched(QueryKind::Recommendations);
            self.replace(next);
        }
    }

    fn fetch_search(&mut self, spec: &SearchSpec) {
        if self.orchestrator.search(&self.state.session, spec).is_some() {
            let next = self.state.with_dispatched(QueryKind::Search);
            self.replace(next);
        }
    }

    fn fetch_stats(&mut self) {
        self.orchestrator.stats();
        let next = self.state.with_dispatched(QueryKind::Stats);
        self.replace(next);
    }

    fn fetch_ab_arm(&mut self) {
        if self.orchestrator.ab_arm(&self.state.session).is_some() {
            let next = self.state.with_dispatched(QueryKind::AbArm);
            self.replace(next);
        }
    }

    fn fetch_item_detail(&mut self, item_id: &str) {
        if self.orchestrator.item_detail(item_id).is_some() {
            let next = self.state.with_dispatched(QueryKind::ItemDetail);
            self.replace(next);
        }
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        let FetchOutcome {
            kind,
            generation,
            result,
        } = outcome;

        if !self.orchestrator.is_current(kind, generation) {
            tracing::debug!(
                kind = %kind,
                generation = generation.0,
                current = self.orchestrator.generation(kind).0,
                "Discarding stale response"
            );
            return;
        }

        let next = match result {
            Ok(FetchPayload::Recommendations(page)) => {
                tracing::info!(
                    algorithm = %page.algorithm,
                    items = page.recommendations.len(),
                    generation = generation.0,
                    "Applied recommendations"
                );
                self.state.with_recommendations(page)
            }
            Ok(FetchPayload::Search { query, page }) => {
                tracing::info!(
                    query = %query,
                    items = page.results.len(),
                    generation = generation.0,
                    "Applied search results"
                );
                self.state.with_search_results(query, page)
            }
            Ok(FetchPayload::Stats(stats)) => self.state.with_stats(stats),
            Ok(FetchPayload::AbArm(assignment)) => {
                tracing::info!(arm = %assignment.arm, bucket = %assignment.bucket, "Applied experiment arm");
                self.state.with_assignment(assignment)
            }
            Ok(FetchPayload::ItemDetail(detail)) => self.state.with_item_detail(detail),
            Err(e) => {
                match kind {
                    QueryKind::Recommendations | QueryKind::Search => {
                        tracing::error!(kind = %kind, error = %e, "Fetch failed");
                    }
                    _ => tracing::warn!(kind = %kind, error = %e, "Background fetch failed"),
                }
                self.state.with_fetch_failure(kind, &e.user_message())
            }
        };

        self.replace(next);
    }
}
