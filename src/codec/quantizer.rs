//! Duty-band quantizer
//!
//! A band `[Dmin, Dmax]` is split into `N` equal bins. Bin `i` is sent at its
//! center `Dmin + (i + 0.5) / N * (Dmax - Dmin)`, and a measured duty is
//! mapped back to the nearest center.

#[cfg(feature = "embedded")]
use micromath::F32Ext;

use crate::types::{BitWidth, DutyBand};

/// Largest supported bin count (one byte per symbol)
pub const MAX_BINS: u16 = 256;

/// Quantizer over one duty band
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    band: DutyBand,
    bins: u16,
}

impl Quantizer {
    /// Create a quantizer with an explicit bin count (`1..=256`)
    #[must_use]
    pub const fn new(band: DutyBand, bins: u16) -> Option<Self> {
        if bins >= 1 && bins <= MAX_BINS {
            Some(Self { band, bins })
        } else {
            None
        }
    }

    /// Create a quantizer with `2^bits` bins
    #[must_use]
    pub const fn for_bit_width(band: DutyBand, width: BitWidth) -> Self {
        Self {
            band,
            bins: width.bins(),
        }
    }

    /// Duty band covered
    #[must_use]
    pub const fn band(&self) -> DutyBand {
        self.band
    }

    /// Number of bins
    #[must_use]
    pub const fn bins(&self) -> u16 {
        self.bins
    }

    /// Width of one bin in duty units
    #[must_use]
    pub fn bin_width(&self) -> f32 {
        self.band.span() / f32::from(self.bins)
    }

    /// Bring a value into range: masked for power-of-two bin counts,
    /// clamped to the last bin otherwise
    #[must_use]
    pub const fn clamp_value(&self, value: u16) -> u16 {
        if self.bins.is_power_of_two() {
            value & (self.bins - 1)
        } else if value >= self.bins {
            self.bins - 1
        } else {
            value
        }
    }

    /// Center duty of bin `index` (index must already be in range)
    #[must_use]
    pub fn bin_center(&self, index: u16) -> f32 {
        let center = (f32::from(index) + 0.5) / f32::from(self.bins);
        (self.band.min() + center * self.band.span()).clamp(0.0, 1.0)
    }

    /// Encode a value as the center duty of its bin
    #[must_use]
    pub fn encode(&self, value: u16) -> f32 {
        self.bin_center(self.clamp_value(value))
    }

    /// Decode a measured duty to the nearest bin
    ///
    /// The duty is clamped into the band, floor-binned, then moved by one
    /// bin when the residual to the floor bin's center reaches half a bin.
    /// NaN decodes to bin 0.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn decode(&self, duty: f32) -> u16 {
        let duty = if duty.is_nan() { self.band.min() } else { self.band.clamp(duty) };
        let n = f32::from(self.bins);
        let rel = (duty - self.band.min()) / self.band.span();

        // rel is in [0, 1] here, so truncation is floor
        let mut index = (rel * n) as i32;
        let residual = rel - (index as f32 + 0.5) / n;
        let half_bin = 0.5 / n;
        if residual >= half_bin {
            index += 1;
        }
        if residual <= -half_bin {
            index -= 1;
        }

        index.clamp(0, i32::from(self.bins) - 1) as u16
    }

    /// Distance from a duty to the center of its decoded bin, in bins
    #[must_use]
    pub fn residual_bins(&self, duty: f32) -> f32 {
        let center = self.bin_center(self.decode(duty));
        ((duty - center) / self.bin_width()).abs()
    }
}

/// Encode `value` (masked to `width` bits) as a duty in `band`
#[must_use]
pub fn encode(value: u8, width: BitWidth, band: DutyBand) -> f32 {
    Quantizer::for_bit_width(band, width).encode(u16::from(value))
}

/// Decode a duty in `band` to a `width`-bit value
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode(duty: f32, width: BitWidth, band: DutyBand) -> u8 {
    Quantizer::for_bit_width(band, width).decode(duty) as u8
}
