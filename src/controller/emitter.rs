use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    error::AppResult,
    models::{InteractionEvent, InteractionType},
    services::providers::DiscoveryApi,
};

use super::{notifications::NotificationKind, ControllerEvent};

/// Fire-and-forget telemetry channel
///
/// Each emission runs as its own task; there is no dedup, ordering or retry between
/// emissions. The settle result comes back as an `InteractionSettled` event so the
/// controller can show a toast.
pub struct InteractionEmitter {
    api: Arc<dyn DiscoveryApi>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl InteractionEmitter {
    pub fn new(api: Arc<dyn DiscoveryApi>, events: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { api, events }
    }

    pub fn emit(&self, event: InteractionEvent) {
        let api = self.api.clone();
        let events = self.events.clone();

        tracing::info!(
            user_id = %event.user_id,
            item_id = %event.item_id,
            interaction = %event.interaction_type,
            dwell_seconds = event.dwell_seconds,
            "Emitting interaction"
        );

        tokio::spawn(async move {
            let result = api.post_event(&event).await;
            let _ = events.send(ControllerEvent::InteractionSettled {
                item_id: event.item_id,
                interaction_type: event.interaction_type,
                result,
            });
        });
    }
}

/// Toast text and kind for a settled emission
pub fn settle_message(
    interaction_type: InteractionType,
    result: &AppResult<()>,
) -> (String, NotificationKind) {
    match result {
        Ok(()) => {
            let message = match interaction_type {
                InteractionType::Click => "Opened",
                InteractionType::View => "View recorded",
                InteractionType::Like => "Liked",
                InteractionType::Bookmark => "Bookmarked",
                InteractionType::Share => "Shared",
                InteractionType::Purchase => "Purchase recorded",
            };
            (message.to_string(), NotificationKind::Success)
        }
        Err(e) => (
            format!("Could not record {}: {}", interaction_type, e.user_message()),
            NotificationKind::Error,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::providers::MockDiscoveryApi;
    use serde_json::Map;

    #[test]
    fn test_settle_message_reflects_outcome() {
        assert_eq!(
            settle_message(InteractionType::Like, &Ok(())),
            ("Liked".to_string(), NotificationKind::Success)
        );

        let failure = Err(AppError::ExternalApi("event returned status 500".to_string()));
        let (message, kind) = settle_message(InteractionType::Bookmark, &failure);
        assert_eq!(kind, NotificationKind::Error);
        assert_eq!(message, "Could not record bookmark: event returned status 500");
    }

    #[tokio::test]
    async fn test_concurrent_emissions_each_settle() {
        let mut mock = MockDiscoveryApi::new();
        mock.expect_post_event()
            .times(3)
            .returning(|event| match event.interaction_type {
                InteractionType::Share => Err(AppError::ExternalApi("boom".to_string())),
                _ => Ok(()),
            });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = InteractionEmitter::new(Arc::new(mock), tx);

        for kind in [InteractionType::Like, InteractionType::Like, InteractionType::Share] {
            emitter.emit(InteractionEvent::new("u1", "item_1", kind, Map::new()));
        }

        let mut failures = 0;
        for _ in 0..3 {
            match rx.recv().await {
                Some(ControllerEvent::InteractionSettled { item_id, result, .. }) => {
                    assert_eq!(item_id, "item_1");
                    if result.is_err() {
                        failures += 1;
                    }
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(failures, 1);
    }
}
