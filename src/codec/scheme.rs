//! Symbol schemes
//!
//! A scheme turns one logical unit (a byte of payload) into one or two duty
//! symbols. Three layers are involved:
//!
//! ```text
//! byte  --to_wire-->  wire value  --encode_wire-->  duty symbol(s)
//! byte  <-from_wire-  wire value  <-decode_wire--  duty symbol(s)
//! ```
//!
//! The wire value is what the checksum covers: the masked byte for the
//! bit-width schemes, the table index for the alphabet scheme. Alphabets
//! need not be a power of two long, so values derived by XOR (checksum) or
//! counting (LEN) go through [`SymbolScheme::reduce`] to land on a valid index.

use heapless::Vec;

use super::alphabet::Alphabet;
use super::checksum::{checksum, MASK7};
use super::quantizer::Quantizer;
use crate::types::{BitWidth, DutyBand};

/// Duty symbols making up one unit (one or two)
pub type UnitDuties = Vec<f32, 2>;

/// Scheme tag, for logging and configuration summaries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeKind {
    /// One symbol per byte
    Single,
    /// High 3-bit group and low 4-bit group as two symbols
    Split,
    /// One symbol per alphabet index
    Alphabet,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SchemeKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Single => defmt::write!(f, "single"),
            Self::Split => defmt::write!(f, "split3+4"),
            Self::Alphabet => defmt::write!(f, "alphabet"),
        }
    }
}

/// Which data band a measured duty falls into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataGroup {
    /// The only band of a single-symbol scheme
    Whole,
    /// Upper group band of the split scheme
    High,
    /// Lower group band of the split scheme
    Low,
}

/// Symbol scheme
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SymbolScheme {
    /// One symbol per byte, value masked to `width` bits
    Single {
        /// Data band quantizer (`2^width` bins)
        quantizer: Quantizer,
        /// Bits per symbol
        width: BitWidth,
    },
    /// 7-bit bytes sent as a 3-bit high group then a 4-bit low group,
    /// each in its own band
    Split {
        /// Quantizer for the high group (8 bins)
        high: Quantizer,
        /// Quantizer for the low group (16 bins)
        low: Quantizer,
    },
    /// One symbol per alphabet index
    Alphabet {
        /// Data band quantizer (one bin per table entry)
        quantizer: Quantizer,
        /// Character table
        alphabet: Alphabet,
    },
}

impl SymbolScheme {
    /// Single-symbol scheme with `width` bits over `band`
    #[must_use]
    pub const fn single(band: DutyBand, width: BitWidth) -> Self {
        Self::Single {
            quantizer: Quantizer::for_bit_width(band, width),
            width,
        }
    }

    /// Split 3+4 scheme over two bands
    #[must_use]
    pub const fn split(high_band: DutyBand, low_band: DutyBand) -> Self {
        Self::Split {
            high: Quantizer::for_bit_width(high_band, BitWidth::BITS3),
            low: Quantizer::for_bit_width(low_band, BitWidth::BITS4),
        }
    }

    /// Alphabet scheme over `band`
    #[must_use]
    pub const fn alphabet(band: DutyBand, alphabet: Alphabet) -> Self {
        Self::Alphabet {
            quantizer: match Quantizer::new(band, alphabet.len()) {
                Some(q) => q,
                // Alphabet lengths are validated to 2..=256
                None => Quantizer::for_bit_width(band, BitWidth::BITS8),
            },
            alphabet,
        }
    }

    /// Scheme tag
    #[must_use]
    pub const fn kind(&self) -> SchemeKind {
        match self {
            Self::Single { .. } => SchemeKind::Single,
            Self::Split { .. } => SchemeKind::Split,
            Self::Alphabet { .. } => SchemeKind::Alphabet,
        }
    }

    /// Symbols sent per unit
    #[must_use]
    pub const fn symbols_per_unit(&self) -> usize {
        match self {
            Self::Split { .. } => 2,
            Self::Single { .. } | Self::Alphabet { .. } => 1,
        }
    }

    /// Mask applied to wire values and the checksum
    ///
    /// For an alphabet this covers the smallest power of two holding every
    /// index, so the XOR of two indices stays under it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn value_mask(&self) -> u8 {
        match self {
            Self::Single { width, .. } => width.mask(),
            Self::Split { .. } => MASK7,
            Self::Alphabet { alphabet, .. } => (alphabet.len().next_power_of_two() - 1) as u8,
        }
    }

    /// Number of distinct wire values
    #[must_use]
    pub const fn value_count(&self) -> u16 {
        match self {
            Self::Single { width, .. } => width.bins(),
            Self::Split { .. } => BitWidth::BITS7.bins(),
            Self::Alphabet { alphabet, .. } => alphabet.len(),
        }
    }

    /// Fold any byte onto a valid wire value: mask, then wrap into range
    ///
    /// Only masks when the value count is a power of two.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn reduce(&self, value: u8) -> u8 {
        ((value & self.value_mask()) as u16 % self.value_count()) as u8
    }

    /// Map a payload byte to its wire value
    #[must_use]
    pub fn to_wire(&self, byte: u8) -> u8 {
        match self {
            Self::Single { .. } | Self::Split { .. } => byte & self.value_mask(),
            Self::Alphabet { alphabet, .. } => alphabet.index_of(byte),
        }
    }

    /// Map a wire value back to a payload byte
    #[must_use]
    pub fn from_wire(&self, value: u8) -> u8 {
        match self {
            Self::Single { .. } | Self::Split { .. } => value & self.value_mask(),
            Self::Alphabet { alphabet, .. } => alphabet.symbol(self.reduce(value)),
        }
    }

    /// Duty symbols for a wire value
    #[must_use]
    pub fn encode_wire(&self, value: u8) -> UnitDuties {
        let mut duties = UnitDuties::new();
        match self {
            Self::Single { quantizer, .. } | Self::Alphabet { quantizer, .. } => {
                let _ = duties.push(quantizer.encode(u16::from(value)));
            }
            Self::Split { high, low } => {
                let _ = duties.push(high.encode(u16::from(value >> 4)));
                let _ = duties.push(low.encode(u16::from(value & 0x0F)));
            }
        }
        duties
    }

    /// Wire value for one unit's measured duties
    ///
    /// Missing symbols decode as the lowest bin.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode_wire(&self, duties: &[f32]) -> u8 {
        let first = duties.first().copied().unwrap_or(0.0);
        match self {
            Self::Single { quantizer, .. } | Self::Alphabet { quantizer, .. } => {
                quantizer.decode(first) as u8
            }
            Self::Split { high, low } => {
                let second = duties.get(1).copied().unwrap_or(0.0);
                Self::combine(high.decode(first) as u8, low.decode(second) as u8)
            }
        }
    }

    /// Duty symbols for a payload byte
    #[must_use]
    pub fn encode_unit(&self, byte: u8) -> UnitDuties {
        self.encode_wire(self.to_wire(byte))
    }

    /// Payload byte for one unit's measured duties
    #[must_use]
    pub fn decode_unit(&self, duties: &[f32]) -> u8 {
        self.from_wire(self.decode_wire(duties))
    }

    /// Decode a single data symbol known to belong to `group`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode_group(&self, group: DataGroup, duty: f32) -> u8 {
        match (self, group) {
            (Self::Split { high, .. }, DataGroup::High) => high.decode(duty) as u8,
            (Self::Split { low, .. }, _) => low.decode(duty) as u8,
            (Self::Single { quantizer, .. } | Self::Alphabet { quantizer, .. }, _) => {
                quantizer.decode(duty) as u8
            }
        }
    }

    /// Join a split scheme's high and low groups into one 7-bit value
    #[must_use]
    pub const fn combine(high: u8, low: u8) -> u8 {
        ((high & 0x07) << 4) | (low & 0x0F)
    }

    /// Checksum of a payload, computed over wire values
    #[must_use]
    pub fn checksum(&self, payload: &[u8]) -> u8 {
        self.reduce(payload.iter().fold(0u8, |acc, &b| acc ^ self.to_wire(b)))
    }

    /// Checksum of values already in wire form
    #[must_use]
    pub fn checksum_wire(&self, values: &[u8]) -> u8 {
        self.reduce(checksum(values, self.value_mask()))
    }

    /// Data band a duty belongs to, if any
    ///
    /// Each band is widened by half a bin so measurements of the edge bins
    /// are still recognised as data.
    #[must_use]
    pub fn data_group(&self, duty: f32) -> Option<DataGroup> {
        match self {
            Self::Single { quantizer, .. } | Self::Alphabet { quantizer, .. } => quantizer
                .band()
                .contains_with_margin(duty, quantizer.bin_width() / 2.0)
                .then_some(DataGroup::Whole),
            Self::Split { high, low } => {
                if high.band().contains_with_margin(duty, high.bin_width() / 2.0) {
                    Some(DataGroup::High)
                } else if low.band().contains_with_margin(duty, low.bin_width() / 2.0) {
                    Some(DataGroup::Low)
                } else {
                    None
                }
            }
        }
    }

    /// Quantizers used by this scheme, high group first for split
    #[must_use]
    pub fn quantizers(&self) -> Vec<Quantizer, 2> {
        let mut quantizers = Vec::new();
        match self {
            Self::Single { quantizer, .. } | Self::Alphabet { quantizer, .. } => {
                let _ = quantizers.push(*quantizer);
            }
            Self::Split { high, low } => {
                let _ = quantizers.push(*high);
                let _ = quantizers.push(*low);
            }
        }
        quantizers
    }

    /// Data bands used by this scheme
    #[must_use]
    pub fn bands(&self) -> Vec<DutyBand, 2> {
        self.quantizers().iter().map(Quantizer::band).collect()
    }
}

impl Default for SymbolScheme {
    fn default() -> Self {
        Self::alphabet(DutyBand::WIDE, Alphabet::DEFAULT)
    }
}
