use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a fixed-interval background loop.
///
/// Dropping the handle stops the loop at its next await point.
pub struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the loop and wait for the in-flight run, if any, to finish.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        match self.join.await {
            Ok(()) => info!("{} stopped", self.name),
            Err(e) => warn!("{} ended abnormally: {}", self.name, e),
        }
    }
}

/// Run `task` now and then every `period` until cancelled.
///
/// Runs never overlap: a slow run delays the next tick rather than piling up.
/// Timing goes through tokio's clock, so paused-time tests drive it.
pub fn spawn_every<F, Fut>(name: &'static str, period: Duration, mut task: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let period = period.max(MIN_PERIOD);

    let join = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => task().await,
            }
        }

        debug!("{} loop exited", name);
    });

    info!("{} started (every {:?})", name, period);

    TaskHandle {
        name,
        shutdown,
        join,
    }
}
