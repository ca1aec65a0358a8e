//! Glitch-filtered level waits

use super::MeasureError;
use crate::hal::{Clock, Deadline, LevelInput};

/// Poll until the input settles at `level`, returning the clock time it was seen
///
/// A level is accepted only when two consecutive reads agree, so a single
/// noisy sample cannot fake an edge. The deadline is checked on every
/// iteration.
///
/// # Errors
///
/// [`MeasureError::Timeout`] if the level is not confirmed before `deadline`.
pub fn wait_for_level<I, C>(
    input: &mut I,
    clock: &C,
    level: bool,
    deadline: Deadline,
) -> Result<u64, MeasureError>
where
    I: LevelInput + ?Sized,
    C: Clock + ?Sized,
{
    loop {
        let now = clock.now_us();
        if input.is_high() == level && input.is_high() == level {
            return Ok(now);
        }
        if deadline.expired_at(now) {
            return Err(MeasureError::Timeout);
        }
        core::hint::spin_loop();
    }
}
