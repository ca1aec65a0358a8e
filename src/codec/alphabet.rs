//! Alphabet table for index-based symbol schemes
//!
//! Characters outside the table encode as index 0. That fallback is part of
//! the link's behavior: the substituted character then shows up as a byte
//! mismatch at the transaction level.

/// Default 64-symbol table: letters, digits, space and full stop.
pub const DEFAULT_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 .";

/// Fixed character table of 2 to 256 entries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alphabet {
    table: &'static [u8],
}

impl Alphabet {
    /// The default 64-symbol alphabet
    pub const DEFAULT: Self = Self {
        table: DEFAULT_ALPHABET,
    };

    /// Create from a table, returns None unless its length is in `2..=256`
    #[must_use]
    pub const fn new(table: &'static [u8]) -> Option<Self> {
        let len = table.len();
        if len >= 2 && len <= 256 {
            Some(Self { table })
        } else {
            None
        }
    }

    /// Number of symbols
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn len(&self) -> u16 {
        self.table.len() as u16
    }

    /// Always false; an alphabet holds at least two symbols
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Index of a character, 0 when the character is not in the table
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn index_of(&self, ch: u8) -> u8 {
        self.table
            .iter()
            .position(|&c| c == ch)
            .map_or(0, |i| i as u8)
    }

    /// Character at an index (clamped to the last entry)
    #[must_use]
    pub fn symbol(&self, index: u8) -> u8 {
        let i = usize::from(index).min(self.table.len() - 1);
        self.table[i]
    }

    /// The raw table
    #[must_use]
    pub const fn table(&self) -> &'static [u8] {
        self.table
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Printable 7-bit ASCII (space through tilde)
#[must_use]
pub const fn is_printable(ch: u8) -> bool {
    ch >= 32 && ch <= 126
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alphabet_unique() {
        let table = DEFAULT_ALPHABET;
        for (i, a) in table.iter().enumerate() {
            assert!(!table[i + 1..].contains(a), "duplicate {}", *a as char);
        }
    }

    #[test]
    fn test_unknown_char_maps_to_zero() {
        assert_eq!(Alphabet::DEFAULT.index_of(b'!'), 0);
        assert_eq!(Alphabet::DEFAULT.index_of(b'A'), 0);
        assert_eq!(Alphabet::DEFAULT.index_of(b'B'), 1);
    }

    #[test]
    fn test_table_size_limits() {
        assert!(Alphabet::new(b"A").is_none());
        assert!(Alphabet::new(b"").is_none());
        assert!(Alphabet::new(&[b'x'; 257]).is_none());
        assert!(Alphabet::new(b"AB").is_some());
        assert!(Alphabet::new(b"ABC").is_some());
        assert!(Alphabet::new(&[b'x'; 256]).is_some());
    }

    #[test]
    fn test_symbol_clamps_past_end() {
        let digits = Alphabet::new(b"0123456789").unwrap();
        assert_eq!(digits.len(), 10);
        assert_eq!(digits.symbol(9), b'9');
        assert_eq!(digits.symbol(12), b'9');
    }
}
