use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct ScheduledTask {
    cancellation_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

/// Cancellation is only observed between invocations: a running callback is
/// never interrupted, and `stop` waits for it to finish.
#[derive(Default)]
pub struct RefreshScheduler {
    slot: Mutex<Option<ScheduledTask>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start<F, Fut>(&self, interval: Duration, mut callback: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.take() {
            shutdown(existing).await;
        }

        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.clone();
        let period = interval.max(Duration::from_millis(1));

        let join_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                callback().await;
            }
            debug!("refresh schedule stopped");
        });

        debug!(interval_ms = period.as_millis() as u64, "refresh schedule started");
        *slot = Some(ScheduledTask {
            cancellation_token,
            join_handle,
        });
    }

    pub async fn stop(&self) -> bool {
        let existing = self.slot.lock().await.take();
        match existing {
            Some(task) => {
                shutdown(task).await;
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

async fn shutdown(task: ScheduledTask) {
    task.cancellation_token.cancel();
    if let Err(error) = task.join_handle.await {
        warn!(%error, "refresh task ended abnormally");
    }
}
