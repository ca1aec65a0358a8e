//! XOR checksum
//!
//! The checksum is the XOR of all wire values, masked to the scheme's bit
//! width. It detects any single corrupted value but is order-independent,
//! so swapped values and pairs of identical errors go unnoticed.

/// Mask for 7-bit (ASCII) checksums
pub const MASK7: u8 = 0x7F;

/// Mask for 8-bit checksums
pub const MASK8: u8 = 0xFF;

/// Masked XOR over a buffer; 0 for an empty buffer
#[must_use]
pub fn checksum(data: &[u8], mask: u8) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b) & mask
}

/// 7-bit XOR checksum
#[must_use]
pub fn checksum7(data: &[u8]) -> u8 {
    checksum(data, MASK7)
}

/// 8-bit XOR checksum
#[must_use]
pub fn checksum8(data: &[u8]) -> u8 {
    checksum(data, MASK8)
}

/// Incremental XOR checksum
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunningChecksum {
    value: u8,
    mask: u8,
}

impl RunningChecksum {
    /// Start a checksum with the given mask
    #[must_use]
    pub const fn new(mask: u8) -> Self {
        Self { value: 0, mask }
    }

    /// Fold one value in
    pub fn update(&mut self, byte: u8) {
        self.value = (self.value ^ byte) & self.mask;
    }

    /// Current checksum
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Compare against a received checksum
    #[must_use]
    pub const fn matches(&self, received: u8) -> bool {
        self.value == received & self.mask
    }
}
