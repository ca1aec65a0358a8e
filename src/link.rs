//! Link Driver
//!
//! Runs whole transactions over the duty link:
//! - Loopback: send each symbol and measure it straight back
//! - Half-duplex: send a frame, then listen for one on the same pins
//!
//! Failed transactions are retried as a whole; the final report carries the
//! verdict, the retry count and a byte-level diff.

pub mod driver;
pub mod report;

pub use driver::LinkDriver;
pub use report::{ByteDiff, HexDiff, TransactionReport, Verdict};

use core::fmt;

use crate::meter::MeasureError;

/// Link failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// A symbol could not be measured
    Measure(MeasureError),
    /// No complete frame before the deadline
    FrameTimeout,
    /// More units than a frame can hold
    Overflow,
}

impl From<MeasureError> for LinkError {
    fn from(e: MeasureError) -> Self {
        Self::Measure(e)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measure(e) => write!(f, "measurement failed: {e}"),
            Self::FrameTimeout => f.write_str("frame timeout"),
            Self::Overflow => f.write_str("frame overflow"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Measure(e) => defmt::write!(f, "Measure({})", e),
            Self::FrameTimeout => defmt::write!(f, "FrameTimeout"),
            Self::Overflow => defmt::write!(f, "Overflow"),
        }
    }
}
