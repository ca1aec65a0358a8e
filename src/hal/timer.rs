//! Timer Abstractions
//!
//! Deadlines, busy-waits and stopwatches over an injected [`Clock`].
//! All waiting in the link is bounded polling against one of these.

use super::Clock;

/// Absolute deadline on a clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at_us: u64,
}

impl Deadline {
    /// Deadline `timeout_us` microseconds from now
    #[must_use]
    pub fn after<C: Clock + ?Sized>(clock: &C, timeout_us: u64) -> Self {
        Self::at(clock.now_us().saturating_add(timeout_us))
    }

    /// Deadline at an absolute clock time
    #[must_use]
    pub const fn at(at_us: u64) -> Self {
        Self { at_us }
    }

    /// Absolute expiry time
    #[must_use]
    pub const fn at_us(&self) -> u64 {
        self.at_us
    }

    /// Check if the deadline has passed at time `now_us`
    #[must_use]
    pub const fn expired_at(&self, now_us: u64) -> bool {
        now_us >= self.at_us
    }

    /// Check if the deadline has passed
    #[must_use]
    pub fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        self.expired_at(clock.now_us())
    }

    /// Get remaining time (zero once expired)
    #[must_use]
    pub fn remaining_us<C: Clock + ?Sized>(&self, clock: &C) -> u64 {
        self.at_us.saturating_sub(clock.now_us())
    }

    /// The earlier of two deadlines
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if other.at_us < self.at_us {
            other
        } else {
            self
        }
    }
}

/// Spin until `us` microseconds have elapsed
pub fn busy_wait_us<C: Clock + ?Sized>(clock: &C, us: u64) {
    busy_wait_until(clock, Deadline::after(clock, us));
}

/// Spin until the deadline passes
pub fn busy_wait_until<C: Clock + ?Sized>(clock: &C, deadline: Deadline) {
    while !deadline.expired(clock) {
        core::hint::spin_loop();
    }
}

/// Stopwatch for timing transactions
#[derive(Clone, Copy, Debug, Default)]
pub struct Stopwatch {
    start: Option<u64>,
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    #[must_use]
    pub const fn new() -> Self {
        Self { start: None }
    }

    /// Create a stopwatch already running
    #[must_use]
    pub fn started<C: Clock + ?Sized>(clock: &C) -> Self {
        Self {
            start: Some(clock.now_us()),
        }
    }

    /// Start the stopwatch
    pub fn start<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.start = Some(clock.now_us());
    }

    /// Get elapsed time in microseconds (zero if not started)
    #[must_use]
    pub fn elapsed_us<C: Clock + ?Sized>(&self, clock: &C) -> u64 {
        self.start
            .map_or(0, |s| clock.now_us().saturating_sub(s))
    }

    /// Stop and return elapsed time
    pub fn stop<C: Clock + ?Sized>(&mut self, clock: &C) -> u64 {
        let elapsed = self.elapsed_us(clock);
        self.start = None;
        elapsed
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embedded")]
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embedded")]
impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Stopwatch {
    fn format(&self, f: defmt::Formatter) {
        match self.start {
            Some(s) => defmt::write!(f, "Stopwatch(since {}us)", s),
            None => defmt::write!(f, "Stopwatch(stopped)"),
        }
    }
}
