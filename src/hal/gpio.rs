//! GPIO Input Adapter
//!
//! Samples the link's receive pin through any `embedded-hal` input.
//! Supports inverted line polarity (e.g. an optocoupler or open-collector
//! receiver stage).

use embedded_hal::digital::InputPin;

use super::LevelInput;

/// Electrical polarity of the receive line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Pin high means PWM high
    #[default]
    Normal,
    /// Pin low means PWM high
    Inverted,
}

impl Polarity {
    /// Map a raw pin level to a line level
    #[must_use]
    pub const fn apply(self, raw_high: bool) -> bool {
        match self {
            Self::Normal => raw_high,
            Self::Inverted => !raw_high,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Polarity {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Normal => defmt::write!(f, "normal"),
            Self::Inverted => defmt::write!(f, "inverted"),
        }
    }
}

/// Link receiver on an `embedded-hal` input pin
pub struct PinInput<I> {
    pin: I,
    polarity: Polarity,
    /// Number of reads the pin rejected
    read_errors: u32,
}

impl<I: InputPin> PinInput<I> {
    /// Wrap an input pin with normal polarity
    #[must_use]
    pub fn new(pin: I) -> Self {
        Self::with_polarity(pin, Polarity::Normal)
    }

    /// Wrap an input pin with the given polarity
    #[must_use]
    pub fn with_polarity(pin: I, polarity: Polarity) -> Self {
        Self {
            pin,
            polarity,
            read_errors: 0,
        }
    }

    /// Configured polarity
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Number of pin reads that failed (counted as low)
    #[must_use]
    pub const fn read_errors(&self) -> u32 {
        self.read_errors
    }

    /// Release the wrapped pin
    pub fn release(self) -> I {
        self.pin
    }
}

impl<I: InputPin> LevelInput for PinInput<I> {
    fn is_high(&mut self) -> bool {
        // A failed read counts as a raw low level
        let raw = if let Ok(high) = self.pin.is_high() {
            high
        } else {
            self.read_errors = self.read_errors.saturating_add(1);
            false
        };
        self.polarity.apply(raw)
    }
}
