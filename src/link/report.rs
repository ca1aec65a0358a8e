//! Transaction reports
//!
//! What the self-test prints after every transaction:
//!
//! ```text
//! TX: "Hello"
//! RX: "Hellp"
//! CHK: tx=0x2A rx=0x2A => OK
//! RESULT: BYTES=FAIL  CHK=OK  => FAIL
//! DIFF @4: tx=6F rx=70
//! ```

use core::fmt;

use heapless::Vec;

use super::LinkError;
use crate::config::MAX_PAYLOAD;

/// Final verdict of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Payload and checksum matched
    Pass,
    /// Every attempt failed
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Verdict {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Pass => defmt::write!(f, "PASS"),
            Self::Fail => defmt::write!(f, "FAIL"),
        }
    }
}

fn ok_fail(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAIL"
    }
}

/// Outcome of a whole transaction, retries included
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReport {
    /// Final verdict
    pub verdict: Verdict,
    /// Attempts made after the first
    pub retries: u8,
    /// Payload sent (after truncation)
    pub tx: Vec<u8, MAX_PAYLOAD>,
    /// Payload received on the last attempt
    pub rx: Vec<u8, MAX_PAYLOAD>,
    /// Checksum sent
    pub tx_checksum: u8,
    /// Checksum received on the last attempt, if it got that far
    pub rx_checksum: Option<u8>,
    /// Error that ended the last attempt early, if any
    pub error: Option<LinkError>,
    /// Wall time for all attempts
    pub elapsed_us: u64,
}

impl TransactionReport {
    /// Whether the transaction passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Received payload equals the sent payload
    #[must_use]
    pub fn bytes_ok(&self) -> bool {
        self.tx == self.rx
    }

    /// Received checksum equals the sent checksum
    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        self.rx_checksum == Some(self.tx_checksum)
    }

    /// Positions where TX and RX differ (missing bytes count)
    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.diff().count()
    }

    /// Byte-level diff between TX and RX
    #[must_use]
    pub fn diff(&self) -> HexDiff<'_> {
        HexDiff::new(&self.tx, &self.rx)
    }
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TX: \"{}\"", Printable(&self.tx))?;
        writeln!(f, "RX: \"{}\"", Printable(&self.rx))?;
        match self.rx_checksum {
            Some(rx) => writeln!(
                f,
                "CHK: tx=0x{:02X} rx=0x{:02X} => {}",
                self.tx_checksum,
                rx,
                ok_fail(self.checksum_ok())
            )?,
            None => writeln!(f, "CHK: tx=0x{:02X} rx=-- => FAIL", self.tx_checksum)?,
        }
        write!(
            f,
            "RESULT: BYTES={}  CHK={}  => {}",
            ok_fail(self.bytes_ok()),
            ok_fail(self.checksum_ok()),
            self.verdict
        )?;
        if self.verdict == Verdict::Fail {
            if let Some(error) = self.error {
                write!(f, "\nERROR: {error}")?;
            }
            if self.retries > 0 {
                write!(f, "\nRETRIES: {}", self.retries)?;
            }
            for diff in self.diff() {
                write!(f, "\n{diff}")?;
            }
        }
        Ok(())
    }
}

/// Bytes shown as text, non-printables escaped as `\xNN`
struct Printable<'a>(&'a [u8]);

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0 {
            if crate::codec::alphabet::is_printable(b) && b != b'"' && b != b'\\' {
                write!(f, "{}", char::from(b))?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}

/// One differing position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteDiff {
    /// Byte offset
    pub index: usize,
    /// Byte sent (None past the end of TX)
    pub tx: Option<u8>,
    /// Byte received (None past the end of RX)
    pub rx: Option<u8>,
}

impl fmt::Display for ByteDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DIFF @{}: tx=", self.index)?;
        match self.tx {
            Some(b) => write!(f, "{b:02X}")?,
            None => f.write_str("--")?,
        }
        f.write_str(" rx=")?;
        match self.rx {
            Some(b) => write!(f, "{b:02X}"),
            None => f.write_str("--"),
        }
    }
}

/// Iterator over the positions where two buffers differ
#[derive(Clone, Debug)]
pub struct HexDiff<'a> {
    tx: &'a [u8],
    rx: &'a [u8],
    index: usize,
}

impl<'a> HexDiff<'a> {
    /// Compare two buffers
    #[must_use]
    pub const fn new(tx: &'a [u8], rx: &'a [u8]) -> Self {
        Self { tx, rx, index: 0 }
    }
}

impl Iterator for HexDiff<'_> {
    type Item = ByteDiff;

    fn next(&mut self) -> Option<ByteDiff> {
        let end = self.tx.len().max(self.rx.len());
        while self.index < end {
            let index = self.index;
            self.index += 1;
            let tx = self.tx.get(index).copied();
            let rx = self.rx.get(index).copied();
            if tx != rx {
                return Some(ByteDiff { index, tx, rx });
            }
        }
        None
    }
}
