//! Shared types used across the duty link
//!
//! This module defines domain-specific types that enforce invariants
//! at construction and provide type safety throughout the codebase.

use core::fmt;

/// Duty ratio in `[0, 1]`
///
/// The fraction of one PWM period during which the line is held high.
/// Construction clamps, so a `DutyRatio` is always a valid output level.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct DutyRatio(f32);

impl DutyRatio {
    /// Line held low for the whole period
    pub const ZERO: Self = Self(0.0);

    /// Line held high for the whole period
    pub const FULL: Self = Self(1.0);

    /// Create from a fraction, clamping into `[0, 1]`
    ///
    /// NaN maps to zero.
    #[must_use]
    pub fn new(fraction: f32) -> Self {
        if fraction.is_nan() {
            Self::ZERO
        } else {
            Self(fraction.clamp(0.0, 1.0))
        }
    }

    /// Get the fraction
    #[must_use]
    pub const fn fraction(self) -> f32 {
        self.0
    }

    /// Get as percentage (truncated)
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_percent(self) -> u8 {
        (self.0 * 100.0) as u8
    }
}

impl fmt::Debug for DutyRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DutyRatio({:.4})", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DutyRatio {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}%", self.as_percent());
    }
}

/// A band of duty ratios reserved for data symbols
///
/// Invariant: `0 <= min < max <= 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DutyBand {
    min: f32,
    max: f32,
}

impl DutyBand {
    /// Single data band used by the byte and alphabet schemes (15%..75%)
    pub const WIDE: Self = Self { min: 0.15, max: 0.75 };

    /// Upper-group band of the split 3+4 scheme (15%..45%)
    pub const SPLIT_HIGH: Self = Self { min: 0.15, max: 0.45 };

    /// Lower-group band of the split 3+4 scheme (55%..85%)
    pub const SPLIT_LOW: Self = Self { min: 0.55, max: 0.85 };

    /// Create a band, returns None unless `0 <= min < max <= 1`
    #[must_use]
    pub fn new(min: f32, max: f32) -> Option<Self> {
        if min >= 0.0 && min < max && max <= 1.0 {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Lower edge
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper edge
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Width of the band
    #[must_use]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Clamp a duty into the band
    #[must_use]
    pub fn clamp(&self, duty: f32) -> f32 {
        duty.clamp(self.min, self.max)
    }

    /// Check whether a duty lies inside the band widened by `margin` on each side
    #[must_use]
    pub fn contains_with_margin(&self, duty: f32, margin: f32) -> bool {
        duty >= self.min - margin && duty <= self.max + margin
    }

    /// Check whether two bands share any duty value
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl Default for DutyBand {
    fn default() -> Self {
        Self::WIDE
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DutyBand {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[{}..{}]", self.min, self.max);
    }
}

/// Symbol bit width (1 to 8 bits)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitWidth(u8);

impl BitWidth {
    /// 3-bit group (upper group of the split scheme)
    pub const BITS3: Self = Self(3);

    /// 4-bit group (lower group of the split scheme)
    pub const BITS4: Self = Self(4);

    /// 7-bit ASCII
    pub const BITS7: Self = Self(7);

    /// Full byte
    pub const BITS8: Self = Self(8);

    /// Create a bit width, returns None outside `1..=8`
    #[must_use]
    pub const fn new(bits: u8) -> Option<Self> {
        if bits >= 1 && bits <= 8 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Number of bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Number of distinct values, `2^bits`
    #[must_use]
    pub const fn bins(self) -> u16 {
        1 << self.0
    }

    /// Mask selecting the low `bits` bits
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn mask(self) -> u8 {
        ((1u16 << self.0) - 1) as u8
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BitWidth {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}bit", self.0);
    }
}

/// Framing control symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlSymbol {
    /// Line idle / guard interval
    Idle,
    /// Frame start
    Start,
    /// Frame end
    Stop,
}

impl ControlSymbol {
    /// All control symbols, in match priority order
    pub const ALL: [Self; 3] = [Self::Idle, Self::Start, Self::Stop];
}

impl fmt::Display for ControlSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("IDLE"),
            Self::Start => f.write_str("START"),
            Self::Stop => f.write_str("STOP"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ControlSymbol {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Start => defmt::write!(f, "START"),
            Self::Stop => defmt::write!(f, "STOP"),
        }
    }
}
