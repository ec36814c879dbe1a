use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic refresh task. Dropping the handle stops it.
#[derive(Debug)]
pub struct RefreshHandle {
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Run a refresh right away and restart the period from now.
    pub fn refresh_now(&self) {
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Call `tick` once immediately and then every `period`. A slow tick
/// delays the next one instead of queueing a burst.
pub fn spawn_refresh<F, Fut>(period: Duration, mut tick: F) -> RefreshHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let wake = Arc::new(Notify::new());
    let notified = Arc::clone(&wake);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = notified.notified() => {
                    tracing::debug!("manual refresh requested");
                    interval.reset();
                }
            }
            tick().await;
        }
    });

    RefreshHandle { wake, task }
}
