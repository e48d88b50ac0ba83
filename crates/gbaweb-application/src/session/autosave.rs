//! Periodic autosave task owned by a session.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A cancellable fixed-interval task.
///
/// The first tick fires one full period after spawning. Cancellation is
/// synchronous: once [`AutosaveTask::cancel`] returns, the tick closure is
/// never started again. Dropping the task cancels it.
pub struct AutosaveTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
    live: Arc<AtomicUsize>,
    cancelled: bool,
}

impl AutosaveTask {
    /// Spawns the task on the current tokio runtime.
    ///
    /// `live` counts tasks that have been spawned and not yet cancelled.
    pub fn spawn<F, Fut>(period: Duration, live: Arc<AtomicUsize>, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        if task_token.is_cancelled() {
                            break;
                        }
                        tick().await;
                    }
                }
            }
        });

        live.fetch_add(1, Ordering::SeqCst);
        Self {
            token,
            handle,
            live,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.token.cancel();
        self.handle.abort();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for AutosaveTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_task(period: Duration, live: Arc<AtomicUsize>) -> (AutosaveTask, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = AutosaveTask::spawn(period, live, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (task, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let live = Arc::new(AtomicUsize::new(0));
        let (_task, ticks) = counting_task(Duration::from_secs(15), live.clone());

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(32)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_immediately() {
        let live = Arc::new(AtomicUsize::new(0));
        let (mut task, ticks) = counting_task(Duration::from_secs(15), live.clone());

        tokio::time::sleep(Duration::from_secs(16)).await;
        task.cancel();
        task.cancel();
        assert!(task.is_cancelled());
        assert_eq!(live.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let live = Arc::new(AtomicUsize::new(0));
        let (task, ticks) = counting_task(Duration::from_secs(15), live.clone());
        drop(task);
        assert_eq!(live.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
