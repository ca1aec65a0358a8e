//! Single-cycle measurement

use super::edge::wait_for_level;
use super::MeasureError;
use crate::hal::{Clock, Deadline, LevelInput};

/// Timing of one PWM cycle, in clock microseconds
///
/// Invariant: `period_us > 0` and `high_us <= period_us`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleSample {
    rise_us: u64,
    period_us: u64,
    high_us: u64,
}

impl CycleSample {
    /// Create a sample, returns None for a zero period or `high > period`
    #[must_use]
    pub const fn new(rise_us: u64, period_us: u64, high_us: u64) -> Option<Self> {
        if period_us == 0 || high_us > period_us {
            None
        } else {
            Some(Self {
                rise_us,
                period_us,
                high_us,
            })
        }
    }

    /// Clock time of the rising edge that opened the cycle
    #[must_use]
    pub const fn rise_us(&self) -> u64 {
        self.rise_us
    }

    /// Period length
    #[must_use]
    pub const fn period_us(&self) -> u64 {
        self.period_us
    }

    /// High time
    #[must_use]
    pub const fn high_us(&self) -> u64 {
        self.high_us
    }

    /// Clock time of the rising edge that closed the cycle
    #[must_use]
    pub const fn next_rise_us(&self) -> u64 {
        self.rise_us.wrapping_add(self.period_us)
    }

    /// Duty ratio of this cycle alone
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duty(&self) -> f32 {
        self.high_us as f32 / self.period_us as f32
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CycleSample {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Cycle({}/{}us)", self.high_us, self.period_us);
    }
}

/// Measure one full PWM cycle
///
/// Synchronises to a rising edge (waiting out an in-progress high pulse
/// first), then timestamps rise, fall and the next rise. All waits share
/// one deadline `timeout_us` from the call.
///
/// # Errors
///
/// [`MeasureError::Timeout`] if any edge is missing,
/// [`MeasureError::Degenerate`] if the timestamps are inconsistent.
pub fn measure_one_cycle<I, C>(
    input: &mut I,
    clock: &C,
    timeout_us: u64,
) -> Result<CycleSample, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    let deadline = Deadline::after(clock, timeout_us);

    // Starting mid-pulse would truncate the high time. Either read being
    // high is enough to wait; a spurious wait returns at once.
    if input.is_high() || input.is_high() {
        wait_for_level(input, clock, false, deadline)?;
    }
    let rise = wait_for_level(input, clock, true, deadline)?;
    finish_cycle(input, clock, rise, deadline)
}

/// Measure the cycle opened by a rising edge already observed at `rise_us`
///
/// Chaining calls on [`CycleSample::next_rise_us`] measures back-to-back
/// cycles without skipping a period to resynchronise.
///
/// # Errors
///
/// As for [`measure_one_cycle`].
pub fn measure_next_cycle<I, C>(
    input: &mut I,
    clock: &C,
    rise_us: u64,
    timeout_us: u64,
) -> Result<CycleSample, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    finish_cycle(input, clock, rise_us, Deadline::after(clock, timeout_us))
}

fn finish_cycle<I, C>(
    input: &mut I,
    clock: &C,
    rise: u64,
    deadline: Deadline,
) -> Result<CycleSample, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    let fall = wait_for_level(input, clock, false, deadline)?;
    let next_rise = wait_for_level(input, clock, true, deadline)?;

    let period = next_rise.wrapping_sub(rise);
    let high = fall.wrapping_sub(rise);
    CycleSample::new(rise, period, high).ok_or(MeasureError::Degenerate)
}
