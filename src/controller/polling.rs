use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{AppError, AppResult};

use super::ControllerEvent;

/// Re-issues the stats query on a fixed cadence
///
/// The scheduler only emits `StatsTick` events; the controller owns the actual fetch so
/// ticks go through the same generation guard as manual refreshes.
pub struct PollingScheduler;

impl PollingScheduler {
    /// Spawns the recurring task. The first tick fires one `period` after start, since
    /// the mount effect issues the initial fetch itself. A zero period is refused.
    pub fn start(
        period: Duration,
        events: mpsc::UnboundedSender<ControllerEvent>,
    ) -> AppResult<PollingHandle> {
        if period.is_zero() {
            return Err(AppError::InvalidInput(
                "Stats polling period must be non-zero".to_string(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            Self::poll_task(period, events, shutdown_rx).await;
        });

        Ok(PollingHandle {
            shutdown_tx,
            task: Some(task),
        })
    }

    async fn poll_task(
        period: Duration,
        events: mpsc::UnboundedSender<ControllerEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(period_secs = period.as_secs(), "Stats polling started");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;
                // Shutdown signal received, or the handle was dropped
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    ticks += 1;
                    if events.send(ControllerEvent::StatsTick).is_err() {
                        tracing::debug!("Controller gone, stopping stats polling");
                        break;
                    }
                }
            }
        }

        tracing::info!(ticks, "Stats polling stopped");
    }
}

/// Owns the polling task; cancelling happens on `shutdown` or on drop
#[derive(Debug)]
pub struct PollingHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Stops the polling task and waits until it has exited
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Stats polling task failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_fixed_cadence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let handle = PollingScheduler::start(Duration::from_secs(30), tx).unwrap();

        let mut offsets = Vec::new();
        for _ in 0..3 {
            match rx.recv().await {
                Some(ControllerEvent::StatsTick) => offsets.push(start.elapsed().as_secs()),
                other => panic!("unexpected event: {:?}", other),
            }
        }

        assert_eq!(offsets, vec![30, 60, 90]);
        assert!(handle.is_running());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = PollingScheduler::start(Duration::from_secs(30), tx).unwrap();

        assert!(matches!(rx.recv().await, Some(ControllerEvent::StatsTick)));
        handle.shutdown().await;

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[tokio::test]
    async fn test_zero_period_is_refused() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = tokio_test::assert_err!(PollingScheduler::start(Duration::ZERO, tx));
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = PollingScheduler::start(Duration::from_secs(30), tx).unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
