use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use super::ControllerEvent;

/// Time a toast spends sliding in
pub const ENTER_SETTLE: Duration = Duration::from_millis(150);
/// Time a toast spends sliding out
pub const EXIT_ANIMATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Where a toast is in its enter/visible/exit animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPhase {
    Entering,
    Visible,
    Exiting,
}

/// Fixed timing shared by every toast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTiming {
    pub enter: Duration,
    pub visible: Duration,
    pub exit: Duration,
}

impl NotificationTiming {
    pub fn new(visible: Duration) -> Self {
        Self {
            enter: ENTER_SETTLE,
            visible,
            exit: EXIT_ANIMATION,
        }
    }

    /// Total time from push to removal
    pub fn lifetime(&self) -> Duration {
        self.enter + self.visible + self.exit
    }
}

impl Default for NotificationTiming {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: Instant,
}

impl Notification {
    /// Animation phase at `now`, or `None` once the lifetime has elapsed
    pub fn phase(&self, now: Instant, timing: &NotificationTiming) -> Option<NotificationPhase> {
        let age = now.saturating_duration_since(self.created_at);
        if age < timing.enter {
            Some(NotificationPhase::Entering)
        } else if age < timing.enter + timing.visible {
            Some(NotificationPhase::Visible)
        } else if age < timing.lifetime() {
            Some(NotificationPhase::Exiting)
        } else {
            None
        }
    }
}

/// Toasts currently on screen, oldest first
///
/// Depth is unbounded; the shared lifetime keeps it bounded under any steady rate.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationQueue {
    entries: Vec<Notification>,
    timing: NotificationTiming,
}

impl NotificationQueue {
    pub fn new(timing: NotificationTiming) -> Self {
        Self {
            entries: Vec::new(),
            timing,
        }
    }

    pub fn timing(&self) -> &NotificationTiming {
        &self.timing
    }

    /// Appends a toast, visible immediately, and returns its id
    pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(Notification {
            id,
            message: message.into(),
            kind,
            created_at: now,
        });
        id
    }

    /// Removes a toast; removing an unknown id is a no-op
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drops every toast whose lifetime has elapsed at `now`
    pub fn expire(&mut self, now: Instant) -> usize {
        let timing = self.timing;
        let before = self.entries.len();
        self.entries.retain(|n| n.phase(now, &timing).is_some());
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(NotificationTiming::default())
    }
}

/// Sends `NotificationExpired(id)` back to the controller once `lifetime` has passed
pub(crate) fn schedule_expiry(
    events: mpsc::UnboundedSender<ControllerEvent>,
    id: Uuid,
    lifetime: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(lifetime).await;
        // Controller may already be gone
        let _ = events.send(ControllerEvent::NotificationExpired(id));
    });
}
