//! PWM Duty-Cycle Link Library
//!
//! This library implements a point-to-point digital link that carries bytes
//! as PWM duty-cycle levels on one GPIO pin and recovers them from duty-cycle
//! measurements taken on another pin. The two endpoints share no clock line;
//! every symbol is re-synchronised by edge timing.
//!
//! # Architecture
//!
//! The crate is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      LINK LAYER                              │
//! │  Link Driver (loopback / half-duplex, retry, report)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    PROTOCOL LAYER                            │
//! │  Frame schedule  │  Symbol classifier  │  Receiver machine   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  CODEC / MEASUREMENT                         │
//! │  Quantizer  │  Symbol schemes  │  Checksum  │  Duty meter    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL COLLABORATORS                          │
//! │  DutyOutput  │  LevelInput  │  Clock  (embedded-hal / sim)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Functional core, imperative shell**: codec and receiver are pure;
//!   only the link driver and the meter touch the collaborators
//! - **Never block forever**: every edge wait polls against a deadline
//! - **Errors are values**: measurement failures are `Result`s, checksum
//!   failures are flags on a delivered frame
//! - **No unsafe in application code**

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Logging macros must be declared before the modules that use them
#[macro_use]
mod logging;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware collaborators
///
/// Duty output, level input and time source traits plus adapters.
pub mod hal;

/// Symbol Codec
///
/// Duty-band quantization, symbol schemes, alphabet table, checksum.
pub mod codec;

/// Duty Meter
///
/// Edge-timed, glitch-filtered duty-cycle measurement.
pub mod meter;

/// Frame Protocol
///
/// Wire schedule, control-symbol classification, receiver state machine.
pub mod protocol;

/// Link Driver
///
/// Transactions, retries and diagnostic reports.
pub mod link;

/// Deterministic software line for host testing
#[cfg(all(feature = "std", not(feature = "embedded")))]
pub mod sim;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::codec::{checksum, SchemeKind, SymbolScheme};
    pub use crate::config::{LengthMode, LinkConfig};
    pub use crate::hal::{Clock, DutyOutput, LevelInput};
    pub use crate::link::{LinkDriver, TransactionReport, Verdict};
    pub use crate::types::*;

    // Embassy
    #[cfg(feature = "embedded")]
    pub use embassy_time::{Duration, Instant, Timer};

    // Logging
    #[cfg(feature = "embedded")]
    pub use defmt::{debug, error, info, trace, warn};
}
