//! Call duration clock
//!
//! The clock is a tokio task owned by the session state. Cancelling aborts
//! the task outright, so no tick can be delivered for a call that already
//! left the active state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy)]
struct ClockStart {
    instant: Instant,
    wall: DateTime<Utc>,
}

/// Periodic elapsed-seconds ticker
#[derive(Debug, Default)]
pub(crate) struct DurationClock {
    start: Option<ClockStart>,
    task: Option<JoinHandle<()>>,
}

impl DurationClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `period`, replacing any running ticker
    ///
    /// `on_tick` receives whole seconds elapsed since this call and returns
    /// whether the clock should keep running.
    pub(crate) fn start<F>(&mut self, runtime: &Handle, period: Duration, on_tick: F)
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        self.cancel();

        let start = ClockStart {
            instant: Instant::now(),
            wall: Utc::now(),
        };
        self.start = Some(start);

        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start.instant + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !on_tick(start.instant.elapsed().as_secs()) {
                    break;
                }
            }
        }));
    }

    /// Abort the ticker and forget the start time
    ///
    /// Returns whether a ticker was running.
    pub(crate) fn cancel(&mut self) -> bool {
        self.start = None;
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Wall-clock time the clock was started
    pub(crate) fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start.map(|s| s.wall)
    }
}

impl Drop for DurationClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_reports_whole_elapsed_seconds() {
        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();

        let mut clock = DurationClock::new();
        clock.start(&Handle::current(), Duration::from_secs(1), move |secs| {
            seen.store(secs, Ordering::SeqCst);
            true
        });
        assert!(clock.started_at().is_some());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();

        let mut clock = DurationClock::new();
        clock.start(&Handle::current(), Duration::from_secs(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(clock.cancel());
        assert!(!clock.is_running());
        assert!(clock.started_at().is_none());

        let before = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), before);
        assert!(!clock.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_stop_the_clock() {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();

        let mut clock = DurationClock::new();
        clock.start(&Handle::current(), Duration::from_secs(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst) < 1
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }
}
