//! Multi-cycle duty averaging

use super::cycle::{measure_one_cycle, CycleSample};
use super::{cycle_timeout_us, MeasureError};
use crate::hal::{Clock, Deadline, LevelInput};

/// Accumulates cycle samples and divides the sums once
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DutyAccumulator {
    period_sum: u64,
    high_sum: u64,
    accepted: u32,
    rejected: u32,
    last_error: Option<MeasureError>,
}

impl DutyAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period_sum: 0,
            high_sum: 0,
            accepted: 0,
            rejected: 0,
            last_error: None,
        }
    }

    /// Add a successful cycle
    pub fn push(&mut self, sample: CycleSample) {
        self.period_sum = self.period_sum.saturating_add(sample.period_us());
        self.high_sum = self.high_sum.saturating_add(sample.high_us());
        self.accepted += 1;
    }

    /// Record a failed cycle (it contributes nothing to the sums)
    pub fn reject(&mut self, error: MeasureError) {
        self.rejected += 1;
        self.last_error = Some(error);
    }

    /// Add the outcome of one cycle measurement
    pub fn record(&mut self, outcome: Result<CycleSample, MeasureError>) {
        match outcome {
            Ok(sample) => self.push(sample),
            Err(e) => self.reject(e),
        }
    }

    /// Cycles accepted so far
    #[must_use]
    pub const fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Cycles rejected so far
    #[must_use]
    pub const fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Sum of high times
    #[must_use]
    pub const fn high_sum(&self) -> u64 {
        self.high_sum
    }

    /// Sum of periods
    #[must_use]
    pub const fn period_sum(&self) -> u64 {
        self.period_sum
    }

    /// Averaged duty, `Σhigh / Σperiod`
    ///
    /// # Errors
    ///
    /// The last cycle error when no cycle was accepted,
    /// [`MeasureError::NoValidCycles`] when the period sum is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn duty(&self) -> Result<f32, MeasureError> {
        if self.accepted == 0 {
            return Err(self.last_error.unwrap_or(MeasureError::NoValidCycles));
        }
        if self.period_sum == 0 {
            return Err(MeasureError::NoValidCycles);
        }
        Ok(self.high_sum as f32 / self.period_sum as f32)
    }
}

/// Measure the average duty over `cycles` PWM cycles
///
/// Each cycle is bounded by [`TIMEOUT_FACTOR`](super::TIMEOUT_FACTOR) times
/// the expected period. Failed cycles are skipped. `cycles == 0` is treated
/// as one.
///
/// # Errors
///
/// See [`DutyAccumulator::duty`].
pub fn measure_duty_avg<I, C>(
    input: &mut I,
    clock: &C,
    expected_period_us: u64,
    cycles: u8,
) -> Result<f32, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    measure_duty_avg_within(input, clock, expected_period_us, cycles, Deadline::at(u64::MAX))
}

/// Like [`measure_duty_avg`], but stops starting new cycles once `deadline` passes
/// and never lets a cycle wait beyond it
///
/// # Errors
///
/// See [`DutyAccumulator::duty`].
pub fn measure_duty_avg_within<I, C>(
    input: &mut I,
    clock: &C,
    expected_period_us: u64,
    cycles: u8,
    deadline: Deadline,
) -> Result<f32, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    let per_cycle = cycle_timeout_us(expected_period_us);
    let mut acc = DutyAccumulator::new();

    for _ in 0..cycles.max(1) {
        let remaining = deadline.remaining_us(clock);
        if remaining == 0 {
            acc.reject(MeasureError::Timeout);
            break;
        }
        acc.record(measure_one_cycle(input, clock, per_cycle.min(remaining)));
    }

    let duty = acc.duty();
    if let Err(e) = duty {
        debug!("duty measurement failed ({} rejected): {}", acc.rejected(), e);
    }
    duty
}
