//! PWM Output Adapter
//!
//! Drives the link's transmit pin through any `embedded-hal` PWM channel.
//! The ratio-to-compare conversion rounds to the nearest counter level so
//! bin centers are reproduced as closely as the timer resolution allows.

use embedded_hal::pwm::SetDutyCycle;

use super::DutyOutput;
use crate::types::DutyRatio;

/// Compute the compare level for a duty ratio on a channel whose 100% level is `max`
///
/// Rounds to the nearest level and never exceeds `max`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn compare_level(ratio: DutyRatio, max: u16) -> u16 {
    let level = (f32::from(max) * ratio.fraction() + 0.5) as u32;
    level.min(u32::from(max)) as u16
}

/// Duty ratio actually produced by a compare level
#[must_use]
pub fn level_ratio(level: u16, max: u16) -> DutyRatio {
    if max == 0 {
        DutyRatio::ZERO
    } else {
        DutyRatio::new(f32::from(level) / f32::from(max))
    }
}

/// Link transmitter on an `embedded-hal` PWM channel
pub struct PwmOutput<P> {
    channel: P,
    /// Last requested ratio
    ratio: DutyRatio,
    /// Last compare level written
    level: u16,
    /// Number of writes the channel rejected
    write_errors: u32,
}

impl<P: SetDutyCycle> PwmOutput<P> {
    /// Wrap a PWM channel, starting with the output held low
    pub fn new(mut channel: P) -> Self {
        let write_errors = u32::from(channel.set_duty_cycle(0).is_err());
        Self {
            channel,
            ratio: DutyRatio::ZERO,
            level: 0,
            write_errors,
        }
    }

    /// Last requested ratio
    #[must_use]
    pub const fn ratio(&self) -> DutyRatio {
        self.ratio
    }

    /// Last compare level written to the channel
    #[must_use]
    pub const fn level(&self) -> u16 {
        self.level
    }

    /// Number of duty writes the channel reported as failed
    #[must_use]
    pub const fn write_errors(&self) -> u32 {
        self.write_errors
    }

    /// Hold the output low (line idle, no modulation)
    pub fn stop(&mut self) {
        self.set_ratio(DutyRatio::ZERO);
    }

    /// Release the wrapped channel
    pub fn release(self) -> P {
        self.channel
    }
}

impl<P: SetDutyCycle> DutyOutput for PwmOutput<P> {
    fn set_ratio(&mut self, ratio: DutyRatio) {
        let level = compare_level(ratio, self.channel.max_duty_cycle());
        if self.channel.set_duty_cycle(level).is_err() {
            self.write_errors = self.write_errors.saturating_add(1);
            return;
        }
        self.ratio = ratio;
        self.level = level;
    }
}
