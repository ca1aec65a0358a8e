//! Symbol classification
//!
//! Control symbols are matched against fixed duties with a symmetric
//! tolerance window. Anything else is tested against the scheme's data
//! bands. Control always wins over data.

#[cfg(feature = "embedded")]
use micromath::F32Ext;

use crate::codec::{DataGroup, SymbolScheme};
use crate::config::{ConfigError, CONTROL_TOLERANCE, DUTY_IDLE, DUTY_START, DUTY_STOP};
use crate::types::ControlSymbol;

/// Duties and match tolerance of the three control symbols
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlSet {
    idle: f32,
    start: f32,
    stop: f32,
    tolerance: f32,
}

impl ControlSet {
    /// IDLE 5%, START 97%, STOP 88%, tolerance 3%
    ///
    /// All three sit outside every built-in data band.
    pub const DEFAULT: Self = Self {
        idle: DUTY_IDLE,
        start: DUTY_START,
        stop: DUTY_STOP,
        tolerance: CONTROL_TOLERANCE,
    };

    /// Create a control set
    #[must_use]
    pub const fn new(idle: f32, start: f32, stop: f32, tolerance: f32) -> Self {
        Self {
            idle,
            start,
            stop,
            tolerance,
        }
    }

    /// Duty transmitted for a control symbol
    #[must_use]
    pub const fn duty(&self, symbol: ControlSymbol) -> f32 {
        match symbol {
            ControlSymbol::Idle => self.idle,
            ControlSymbol::Start => self.start,
            ControlSymbol::Stop => self.stop,
        }
    }

    /// Match tolerance
    #[must_use]
    pub const fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Control symbol whose window contains `duty`, if any
    #[must_use]
    pub fn match_duty(&self, duty: f32) -> Option<ControlSymbol> {
        ControlSymbol::ALL
            .into_iter()
            .find(|&sym| (duty - self.duty(sym)).abs() <= self.tolerance)
    }

    /// Check that no control window overlaps another or could swallow a data symbol
    ///
    /// A control clashes with a band when it lies inside it, or when the
    /// nearest bin center is within the tolerance.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ControlOverlap`] naming the offending symbol.
    pub fn check_against(&self, scheme: &SymbolScheme) -> Result<(), ConfigError> {
        for (i, &sym) in ControlSymbol::ALL.iter().enumerate() {
            let duty = self.duty(sym);

            for &other in &ControlSymbol::ALL[i + 1..] {
                if (duty - self.duty(other)).abs() <= 2.0 * self.tolerance {
                    return Err(ConfigError::ControlOverlap(other));
                }
            }

            for q in &scheme.quantizers() {
                let nearest = q.bin_center(q.decode(duty));
                if q.band().contains_with_margin(duty, 0.0)
                    || (duty - nearest).abs() <= self.tolerance
                {
                    return Err(ConfigError::ControlOverlap(sym));
                }
            }
        }
        Ok(())
    }
}

impl Default for ControlSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What a measured duty was recognised as
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Classified {
    /// A control symbol
    Control(ControlSymbol),
    /// A data symbol in the given band, with the measured duty
    Data(DataGroup, f32),
    /// Neither (transition, glitch or foreign signal)
    Noise,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Classified {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Control(sym) => defmt::write!(f, "{}", sym),
            Self::Data(_, duty) => defmt::write!(f, "data({})", duty),
            Self::Noise => defmt::write!(f, "noise"),
        }
    }
}

/// Classify a measured duty
#[must_use]
pub fn classify(duty: f32, controls: &ControlSet, scheme: &SymbolScheme) -> Classified {
    if duty.is_nan() {
        return Classified::Noise;
    }
    if let Some(sym) = controls.match_duty(duty) {
        return Classified::Control(sym);
    }
    match scheme.data_group(duty) {
        Some(group) => Classified::Data(group, duty),
        None => Classified::Noise,
    }
}
