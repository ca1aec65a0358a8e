//! System configuration and link constants
//!
//! This module defines compile-time constants for the duty link hardware and
//! timing, plus the runtime [`LinkConfig`] the driver is built from.
//! All pin mappings, PWM parameters and protocol timing are centralized here.

use core::fmt;

use crate::codec::{Alphabet, SymbolScheme};
use crate::protocol::ControlSet;
use crate::types::{BitWidth, ControlSymbol, DutyBand};

/// PWM carrier frequency (1 kHz)
pub const F_PWM_HZ: u32 = 1_000;

/// PWM counter TOP value (1000 counts per period)
pub const PWM_TOP: u16 = 999;

/// Periods each START/STOP symbol is held
pub const SYMBOL_CYCLES: u8 = 2;

/// Periods each data symbol is held
pub const DATA_CYCLES: u8 = 2;

/// Cycles averaged per symbol measurement
pub const MEASURE_CYCLES: u8 = 2;

/// Settling guard before measuring: a fraction of one period in loopback,
/// of a whole slot in half-duplex
pub const GUARD_FRACTION: f32 = 0.25;

/// Periods of IDLE before START
pub const IDLE_LEAD_CYCLES: u8 = 2;

/// Periods of IDLE after STOP
pub const IDLE_TAIL_CYCLES: u8 = 1;

/// Transaction retries after the first failed attempt
pub const MAX_RETRIES: u8 = 3;

/// Pause between transaction attempts, line held IDLE
pub const RETRY_DELAY_US: u64 = 10_000;

/// How long a half-duplex receiver listens for START
pub const LISTEN_TIMEOUT_US: u64 = 1_000_000;

/// Longest console line accepted by the self-test
pub const LINE_MAX: usize = 128;

/// Longest payload a frame carries (longer payloads are truncated)
pub const MAX_PAYLOAD: usize = 255;

/// Receive buffer capacity: payload plus LEN and checksum units
pub const FRAME_CAPACITY: usize = MAX_PAYLOAD + 2;

/// IDLE control duty
pub const DUTY_IDLE: f32 = 0.05;

/// START control duty
pub const DUTY_START: f32 = 0.97;

/// STOP control duty
pub const DUTY_STOP: f32 = 0.88;

/// Control symbol match tolerance (symmetric)
pub const CONTROL_TOLERANCE: f32 = 0.03;

/// Highest PWM frequency the polling meter is configured for
pub const MAX_PWM_HZ: u32 = 100_000;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments (jumper TX to RX for loopback)

    /// PWM transmit output (TIM2 CH1)
    pub const TX: &str = "PA0";

    /// Duty receive input
    pub const RX: &str = "PA1";

    /// Status LED
    pub const LED_STATUS: &str = "PA5";
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    /// Transmit PWM timer
    pub const TX_PWM: u8 = 2;
}

/// How the receiver learns the payload length
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LengthMode {
    /// Length is implied by the units between START and STOP
    #[default]
    Implicit,
    /// A LEN unit follows START
    Explicit,
}

#[cfg(feature = "embedded")]
impl defmt::Format for LengthMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Implicit => defmt::write!(f, "implicit"),
            Self::Explicit => defmt::write!(f, "LEN"),
        }
    }
}

/// Configuration error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// PWM frequency zero or above [`MAX_PWM_HZ`]
    InvalidFrequency,
    /// A cycle count is zero
    ZeroCycles,
    /// Guard fraction outside `[0, 1)`
    GuardOutOfRange,
    /// Data bands overlap each other
    InvalidBand,
    /// A control window overlaps a data band or another control window
    ControlOverlap(ControlSymbol),
    /// Alphabet table size is outside `2..=256`
    AlphabetSize,
    /// Half-duplex slot leaves nothing to measure after the guard
    SlotTooShort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrequency => f.write_str("invalid PWM frequency"),
            Self::ZeroCycles => f.write_str("cycle count must be non-zero"),
            Self::GuardOutOfRange => f.write_str("guard fraction out of range"),
            Self::InvalidBand => f.write_str("data bands overlap"),
            Self::ControlOverlap(sym) => write!(f, "{sym} overlaps another symbol"),
            Self::AlphabetSize => f.write_str("alphabet size must be 2 to 256"),
            Self::SlotTooShort => f.write_str("slot too short to measure"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidFrequency => defmt::write!(f, "InvalidFrequency"),
            Self::ZeroCycles => defmt::write!(f, "ZeroCycles"),
            Self::GuardOutOfRange => defmt::write!(f, "GuardOutOfRange"),
            Self::InvalidBand => defmt::write!(f, "InvalidBand"),
            Self::ControlOverlap(sym) => defmt::write!(f, "ControlOverlap({})", sym),
            Self::AlphabetSize => defmt::write!(f, "AlphabetSize"),
            Self::SlotTooShort => defmt::write!(f, "SlotTooShort"),
        }
    }
}

/// Runtime link configuration
///
/// Built from the constants above. The `with_*` methods return a modified
/// copy, so a profile can be tweaked without mutation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkConfig {
    scheme: SymbolScheme,
    controls: ControlSet,
    length_mode: LengthMode,
    pwm_freq_hz: u32,
    symbol_cycles: u8,
    data_cycles: u8,
    measure_cycles: u8,
    guard_fraction: f32,
    max_retries: u8,
    retry_delay_us: u64,
    listen_timeout_us: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::alphabet_loopback()
    }
}

impl LinkConfig {
    /// Loopback self-test: alphabet scheme over the wide band
    #[must_use]
    pub const fn alphabet_loopback() -> Self {
        Self {
            scheme: SymbolScheme::alphabet(DutyBand::WIDE, Alphabet::DEFAULT),
            controls: ControlSet::DEFAULT,
            length_mode: LengthMode::Implicit,
            pwm_freq_hz: F_PWM_HZ,
            symbol_cycles: SYMBOL_CYCLES,
            data_cycles: DATA_CYCLES,
            measure_cycles: MEASURE_CYCLES,
            guard_fraction: GUARD_FRACTION,
            max_retries: MAX_RETRIES,
            retry_delay_us: RETRY_DELAY_US,
            listen_timeout_us: LISTEN_TIMEOUT_US,
        }
    }

    /// Raw bytes, one 8-bit symbol each, with an explicit LEN unit
    #[must_use]
    pub const fn byte_frame() -> Self {
        Self::alphabet_loopback()
            .with_scheme(SymbolScheme::single(DutyBand::WIDE, BitWidth::BITS8))
            .with_length_mode(LengthMode::Explicit)
    }

    /// 7-bit ASCII as a 3-bit high group and a 4-bit low group in separate bands
    #[must_use]
    pub const fn split7() -> Self {
        Self::alphabet_loopback().with_scheme(SymbolScheme::split(
            DutyBand::SPLIT_HIGH,
            DutyBand::SPLIT_LOW,
        ))
    }

    /// Two endpoints taking turns on one line pair
    ///
    /// Slots of four periods: one settles, three are averaged. START and
    /// STOP are held as long as a data slot so each fills a whole slot.
    #[must_use]
    pub const fn half_duplex() -> Self {
        Self::alphabet_loopback()
            .with_symbol_cycles(4)
            .with_data_cycles(4)
    }

    /// Replace the symbol scheme
    #[must_use]
    pub const fn with_scheme(mut self, scheme: SymbolScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Use an alphabet scheme over `band` with a custom table
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlphabetSize`] unless the table holds 2 to 256 entries.
    pub fn with_alphabet_table(
        self,
        band: DutyBand,
        table: &'static [u8],
    ) -> Result<Self, ConfigError> {
        let alphabet = Alphabet::new(table).ok_or(ConfigError::AlphabetSize)?;
        Ok(self.with_scheme(SymbolScheme::alphabet(band, alphabet)))
    }

    /// Replace the control symbol set
    #[must_use]
    pub const fn with_controls(mut self, controls: ControlSet) -> Self {
        self.controls = controls;
        self
    }

    /// Set the length mode
    #[must_use]
    pub const fn with_length_mode(mut self, mode: LengthMode) -> Self {
        self.length_mode = mode;
        self
    }

    /// Set the PWM frequency
    #[must_use]
    pub const fn with_pwm_frequency(mut self, hz: u32) -> Self {
        self.pwm_freq_hz = hz;
        self
    }

    /// Set the START/STOP hold in periods
    #[must_use]
    pub const fn with_symbol_cycles(mut self, cycles: u8) -> Self {
        self.symbol_cycles = cycles;
        self
    }

    /// Set the data symbol hold in periods
    #[must_use]
    pub const fn with_data_cycles(mut self, cycles: u8) -> Self {
        self.data_cycles = cycles;
        self
    }

    /// Set the cycles averaged per measurement
    #[must_use]
    pub const fn with_measure_cycles(mut self, cycles: u8) -> Self {
        self.measure_cycles = cycles;
        self
    }

    /// Set the settling guard fraction
    #[must_use]
    pub const fn with_guard_fraction(mut self, fraction: f32) -> Self {
        self.guard_fraction = fraction;
        self
    }

    /// Set the retry limit
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the pause between attempts
    #[must_use]
    pub const fn with_retry_delay_us(mut self, us: u64) -> Self {
        self.retry_delay_us = us;
        self
    }

    /// Set how long a receiver waits for START
    #[must_use]
    pub const fn with_listen_timeout_us(mut self, us: u64) -> Self {
        self.listen_timeout_us = us;
        self
    }

    /// Symbol scheme
    #[must_use]
    pub const fn scheme(&self) -> SymbolScheme {
        self.scheme
    }

    /// Control symbol set
    #[must_use]
    pub const fn controls(&self) -> ControlSet {
        self.controls
    }

    /// Length mode
    #[must_use]
    pub const fn length_mode(&self) -> LengthMode {
        self.length_mode
    }

    /// PWM frequency in Hz
    #[must_use]
    pub const fn pwm_frequency(&self) -> u32 {
        self.pwm_freq_hz
    }

    /// START/STOP hold in periods
    #[must_use]
    pub const fn symbol_cycles(&self) -> u8 {
        self.symbol_cycles
    }

    /// Data symbol hold in periods
    #[must_use]
    pub const fn data_cycles(&self) -> u8 {
        self.data_cycles
    }

    /// Cycles averaged per measurement
    #[must_use]
    pub const fn measure_cycles(&self) -> u8 {
        self.measure_cycles
    }

    /// Settling guard fraction
    #[must_use]
    pub const fn guard_fraction(&self) -> f32 {
        self.guard_fraction
    }

    /// Retry limit
    #[must_use]
    pub const fn max_retries(&self) -> u8 {
        self.max_retries
    }

    /// Pause between attempts
    #[must_use]
    pub const fn retry_delay_us(&self) -> u64 {
        self.retry_delay_us
    }

    /// How long a receiver waits for START
    #[must_use]
    pub const fn listen_timeout_us(&self) -> u64 {
        self.listen_timeout_us
    }

    /// PWM period in microseconds
    #[must_use]
    pub const fn period_us(&self) -> u64 {
        if self.pwm_freq_hz == 0 {
            0
        } else {
            1_000_000 / self.pwm_freq_hz as u64
        }
    }

    /// Duration of one data slot
    #[must_use]
    pub const fn slot_us(&self) -> u64 {
        self.period_us() * self.data_cycles as u64
    }

    /// Duration of a START or STOP symbol
    #[must_use]
    pub const fn symbol_us(&self) -> u64 {
        self.period_us() * self.symbol_cycles as u64
    }

    /// Settling time before a loopback measurement (a fraction of one period)
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn loopback_guard_us(&self) -> u64 {
        (self.period_us() as f32 * self.guard_fraction) as u64
    }

    /// Periods skipped at the start of each half-duplex slot
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn slot_guard_cycles(&self) -> u8 {
        let guard = f32::from(self.data_cycles) * self.guard_fraction;
        let whole = guard as u8;
        if f32::from(whole) < guard {
            whole.saturating_add(1)
        } else {
            whole
        }
    }

    /// Periods a half-duplex receiver averages in each slot
    #[must_use]
    pub fn slot_measure_cycles(&self) -> u8 {
        self.data_cycles.saturating_sub(self.slot_guard_cycles())
    }

    /// Check the configuration is usable for loopback
    ///
    /// # Errors
    ///
    /// The first problem found, see [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pwm_freq_hz == 0 || self.pwm_freq_hz > MAX_PWM_HZ {
            return Err(ConfigError::InvalidFrequency);
        }
        if self.symbol_cycles == 0 || self.data_cycles == 0 || self.measure_cycles == 0 {
            return Err(ConfigError::ZeroCycles);
        }
        if !(0.0..1.0).contains(&self.guard_fraction) {
            return Err(ConfigError::GuardOutOfRange);
        }

        let bands = self.scheme.bands();
        if let [high, low] = bands.as_slice() {
            if high.overlaps(low) {
                return Err(ConfigError::InvalidBand);
            }
        }

        self.controls.check_against(&self.scheme)
    }

    /// Check the configuration is usable for half-duplex slots
    ///
    /// # Errors
    ///
    /// Anything [`validate`](Self::validate) reports, or
    /// [`ConfigError::SlotTooShort`] when a slot has no period left after the
    /// guard or START/STOP are held shorter than a slot.
    pub fn validate_half_duplex(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.slot_measure_cycles() == 0 || self.symbol_cycles < self.data_cycles {
            return Err(ConfigError::SlotTooShort);
        }
        Ok(())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LinkConfig({} {} @{}Hz sym={} data={} avg={})",
            self.scheme.kind(),
            self.length_mode,
            self.pwm_freq_hz,
            self.symbol_cycles,
            self.data_cycles,
            self.measure_cycles
        );
    }
}
