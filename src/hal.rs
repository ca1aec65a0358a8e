//! Hardware Collaborators
//!
//! The link core consumes exactly three capabilities from the hardware:
//! setting an output duty ratio, sampling an input level, and reading a
//! monotonic microsecond clock. They are expressed as traits so the same
//! core runs against `embedded-hal` peripherals on target and against the
//! simulated line on the host.

pub mod gpio;
pub mod pwm;
pub mod timer;

pub use gpio::PinInput;
pub use pwm::PwmOutput;
pub use timer::{busy_wait_us, Deadline};

use crate::types::DutyRatio;

/// PWM output whose duty ratio can be changed at any time
pub trait DutyOutput {
    /// Set the output duty ratio (idempotent)
    fn set_ratio(&mut self, ratio: DutyRatio);
}

/// Digital input sampled by polling
pub trait LevelInput {
    /// Read the current line level, `true` when high
    fn is_high(&mut self) -> bool;
}

/// Monotonic microsecond time source
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin
    fn now_us(&self) -> u64;
}

impl<T: DutyOutput + ?Sized> DutyOutput for &mut T {
    fn set_ratio(&mut self, ratio: DutyRatio) {
        (**self).set_ratio(ratio);
    }
}

impl<T: LevelInput + ?Sized> LevelInput for &mut T {
    fn is_high(&mut self) -> bool {
        (**self).is_high()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}
