//! Randomized pauses between polls

use rand::Rng;
use std::time::Duration;

use crate::{Error, Result};

/// Why a loop is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Before the first fetch of a loop
    Startup,
    /// After a failed fetch
    Retry,
    /// After a page that carried a next link
    Page,
    /// After a full round ending in a delta link
    Idle,
}

/// Bounds for every randomized pause a sync loop takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    /// Upper bound of the startup stagger
    pub startup_stagger: Duration,
    /// Upper bound of the pause after a failed fetch
    pub retry_max: Duration,
    /// Upper bound of the pause between pages of one round
    pub page_max: Duration,
    /// Idle pauses are strictly longer than this
    pub idle_min: Duration,
    /// Upper bound of the idle pause
    pub idle_max: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            startup_stagger: Duration::from_secs(30),
            retry_max: Duration::from_secs(3),
            page_max: Duration::from_secs(3),
            idle_min: Duration::from_secs(30),
            idle_max: Duration::from_secs(60),
        }
    }
}

impl PollSchedule {
    /// A schedule that never sleeps
    pub fn immediate() -> Self {
        Self {
            startup_stagger: Duration::ZERO,
            retry_max: Duration::ZERO,
            page_max: Duration::ZERO,
            idle_min: Duration::ZERO,
            idle_max: Duration::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        // idle pauses are drawn in whole milliseconds strictly above the minimum
        if self.idle_max.as_millis() <= self.idle_min.as_millis() {
            return Err(Error::Config(format!(
                "idle maximum {:?} must be above idle minimum {:?}",
                self.idle_max, self.idle_min
            )));
        }
        Ok(())
    }

    /// Draw a pause length using the thread-local RNG
    pub fn draw(&self, pause: Pause) -> Duration {
        self.draw_with(pause, &mut rand::thread_rng())
    }

    pub fn draw_with<R: Rng + ?Sized>(&self, pause: Pause, rng: &mut R) -> Duration {
        match pause {
            Pause::Startup => uniform_below(self.startup_stagger, rng),
            Pause::Retry => uniform_below(self.retry_max, rng),
            Pause::Page => uniform_below(self.page_max, rng),
            Pause::Idle => uniform_above(self.idle_min, self.idle_max, rng),
        }
    }
}

/// Uniform in `[0, max)` at millisecond resolution
fn uniform_below<R: Rng + ?Sized>(max: Duration, rng: &mut R) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..max_ms))
}

/// Uniform in `(min, max]` at millisecond resolution
fn uniform_above<R: Rng + ?Sized>(min: Duration, max: Duration, rng: &mut R) -> Duration {
    let low = min.as_millis() as u64 + 1;
    let high = max.as_millis() as u64;
    if low > high {
        return max;
    }
    Duration::from_millis(rng.gen_range(low..=high))
}
