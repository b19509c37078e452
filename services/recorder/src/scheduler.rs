//! Session scheduler
//!
//! Gates each pipeline to trading hours: a blocking (task-suspending)
//! wait until market open, and a close predicate the ingestor's control
//! loop samples periodically. The predicate is advisory, not an
//! interrupt; the ingestor is responsible for observing it.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tracing::info;

/// Session open/close times for one trading day
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    /// Ingestion start gate
    pub open: NaiveTime,
    /// Session end sampled by the ingestor
    pub close: NaiveTime,
}

impl SessionClock {
    /// Build a clock from open/close wall-clock times
    #[must_use]
    pub const fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// `max(0, open - now)` for today's open
    #[must_use]
    pub fn delay_until_open(&self, now: NaiveDateTime) -> Duration {
        let open_at = now.date().and_time(self.open);
        (open_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// True once `now` has reached the session close
    #[must_use]
    pub fn is_past_close(&self, now: NaiveTime) -> bool {
        now >= self.close
    }

    /// Suspend the calling task until market open. A one-second pad
    /// keeps the wake on the open side of the gate.
    pub async fn wait_for_open(&self) {
        let delay = self.delay_until_open(Local::now().naive_local());
        if delay > Duration::ZERO {
            info!(wait_secs = delay.as_secs(), "waiting for market open");
            tokio::time::sleep(delay + Duration::from_secs(1)).await;
        }
    }
}
