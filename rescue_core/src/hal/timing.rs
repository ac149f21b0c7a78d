//! Deadline and interval timers over a [`Clock`](super::Clock) reading
//!
//! Both are plain values fed with `now_ms`, so they can be checked from any
//! polling loop without owning the clock.

/// A point in time after which some work must give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start_ms: u64,
    duration_ms: u64,
}

impl Deadline {
    pub fn new(now_ms: u64, duration_ms: u64) -> Self {
        Self {
            start_ms: now_ms,
            duration_ms,
        }
    }

    pub fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }

    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.duration_ms.saturating_sub(self.elapsed(now_ms))
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.elapsed(now_ms) >= self.duration_ms
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }
}

/// Fires once per period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Interval {
    /// An interval whose first firing is one full period after `now_ms`
    pub fn new(now_ms: u64, period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: Some(now_ms),
        }
    }

    /// An interval that is due immediately
    pub fn immediate(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms,
        }
    }

    /// Restart the period from `now_ms`
    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Returns true and restarts the period when due
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.reset(now_ms);
            true
        } else {
            false
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}
