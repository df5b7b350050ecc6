//! Wall-clock countdown.
//!
//! A countdown does no work on its own; remaining time is derived from the
//! declared duration and the monotonic clock whenever it is asked for.
//! `tokio::time::Instant` is used so paused-clock tests see simulated time.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    duration_secs: u64,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Countdown {
    pub fn start(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Wall-clock timestamp of the start, for display.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Declared duration minus whole elapsed seconds.
    ///
    /// Can go negative only between the deadline and the timer message being
    /// handled.
    pub fn remaining_secs(&self) -> i64 {
        let elapsed = i64::try_from(self.elapsed_secs()).unwrap_or(i64::MAX);
        let duration = i64::try_from(self.duration_secs).unwrap_or(i64::MAX);
        duration.saturating_sub(elapsed)
    }

    /// Remaining time clamped at zero.
    pub fn remaining_clamped(&self) -> u64 {
        self.duration_secs.saturating_sub(self.elapsed_secs())
    }
}
