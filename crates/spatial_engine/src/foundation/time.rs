//! Time management utilities

use std::time::{Duration, Instant};

/// High-precision timer measuring the time between simulation ticks
pub struct Timer {
    last_tick: Instant,
    delta: Duration,
    total: Duration,
    tick_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            total: Duration::ZERO,
            tick_count: 0,
        }
    }

    /// Update the timer (should be called once per tick) and return the delta
    pub fn update(&mut self) -> Duration {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_tick);
        self.total += self.delta;
        self.last_tick = now;
        self.tick_count += 1;
        self.delta
    }

    /// Forget the time spent while paused so the next delta starts from now
    pub fn resync(&mut self) {
        self.last_tick = Instant::now();
    }

    /// Time between the last two updates
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get the total elapsed time since timer creation
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Get the current tick count
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Time elapsed since the last update
    pub fn since_last_update(&self) -> Duration {
        self.last_tick.elapsed()
    }
}

/// Fixed-rate pacing for a loop running at a target number of ticks per second
#[derive(Debug, Clone, Copy)]
pub struct TickRate {
    period: Duration,
}

impl TickRate {
    /// Create a pacing for `ticks_per_second`; zero is treated as one
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / ticks_per_second.max(1),
        }
    }

    /// Length of one tick
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left in the current tick after `spent` of work
    pub fn remaining(&self, spent: Duration) -> Duration {
        self.period.saturating_sub(spent)
    }
}
