use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self as tokio_time, Instant, MissedTickBehavior};
use tracing::debug;

use crate::engine::SharedEngine;

/// Counts study time while a lesson page is open.
///
/// Ticks the engine once per `period` until stopped. Dropping the tracker
/// stops it as well.
pub struct TimeTracker {
    handle: JoinHandle<()>,
}

impl TimeTracker {
    /// Spawn the ticking task on the current runtime.
    #[must_use]
    pub fn start(engine: SharedEngine, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio_time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                engine.lock().await.tick().await;
            }
        });
        debug!(period_ms = period.as_millis(), "time tracker started");
        Self { handle }
    }

    pub fn stop(&self) {
        if !self.handle.is_finished() {
            self.handle.abort();
            debug!("time tracker stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for TimeTracker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
