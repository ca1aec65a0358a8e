//! Duty Meter
//!
//! Measures the duty ratio of the incoming square wave by polling the input
//! and timestamping level transitions:
//!
//! ```text
//!        rise        fall              next rise
//!         ┌───────────┐                 ┌───
//!  ───────┘           └─────────────────┘
//!         |<- high  ->|
//!         |<-------------- period ----->|
//! ```
//!
//! Single-cycle samples are summed and divided once, which damps jitter
//! better than averaging per-cycle ratios. Every wait is bounded by a
//! deadline derived from the expected period, so a silent line produces an
//! error instead of a hang.

pub mod average;
pub mod cycle;
pub mod edge;

pub use average::{measure_duty_avg, measure_duty_avg_within, DutyAccumulator};
pub use cycle::{measure_next_cycle, measure_one_cycle, CycleSample};
pub use edge::wait_for_level;

use core::fmt;

/// Edge waits time out after this many expected periods
pub const TIMEOUT_FACTOR: u64 = 5;

/// Sentinel duty reported for an invalid measurement
pub const INVALID_DUTY: f32 = -1.0;

/// Measurement failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureError {
    /// No edge observed before the deadline
    Timeout,
    /// Timestamps gave a zero period or a high time longer than the period
    Degenerate,
    /// No cycle in an averaging batch produced a usable sample
    NoValidCycles,
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout waiting for edge"),
            Self::Degenerate => f.write_str("degenerate cycle timing"),
            Self::NoValidCycles => f.write_str("no valid cycles"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for MeasureError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Degenerate => defmt::write!(f, "Degenerate"),
            Self::NoValidCycles => defmt::write!(f, "NoValidCycles"),
        }
    }
}

/// Timeout for one cycle measurement given the expected PWM period
#[must_use]
pub const fn cycle_timeout_us(expected_period_us: u64) -> u64 {
    expected_period_us.saturating_mul(TIMEOUT_FACTOR)
}

/// Collapse a measurement result into the raw float form, [`INVALID_DUTY`] on error
#[must_use]
pub fn duty_or_invalid(result: Result<f32, MeasureError>) -> f32 {
    result.unwrap_or(INVALID_DUTY)
}
