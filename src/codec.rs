//! Symbol Codec
//!
//! Maps symbol values to PWM duty ratios and back:
//! - Quantizer: equal-width bins over a duty band, nearest-bin decode
//! - Symbol schemes: single symbol per byte, split 3+4 groups, alphabet index
//! - Alphabet: fixed character table with linear lookup
//! - Checksum: masked XOR over wire values
//!
//! Everything here is pure and infallible. Out-of-range inputs are masked or
//! clamped, never rejected; corruption is caught by the checksum instead.

pub mod alphabet;
pub mod checksum;
pub mod quantizer;
pub mod scheme;

pub use alphabet::Alphabet;
pub use checksum::checksum;
pub use quantizer::{decode, encode, Quantizer};
pub use scheme::{DataGroup, SchemeKind, SymbolScheme, UnitDuties};
