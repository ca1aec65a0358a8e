//! Receiver state machine
//!
//! The receiver state is a plain value: [`step`] takes the current state and
//! one classified symbol and returns the next state plus an outcome. Nothing
//! is mutated in place, so any state can be replayed or inspected in tests.
//!
//! ```text
//!          START            data             STOP
//!  Idle ---------> StartSeen ------> Receiving -------> Idle (Frame)
//!                     |  STOP                   START
//!                     +------> Idle (NoFrame)   <-----  (restart)
//! ```

use heapless::Vec;

use super::classify::{classify, Classified, ControlSet};
use crate::codec::{DataGroup, SymbolScheme};
use crate::config::{LengthMode, FRAME_CAPACITY, MAX_PAYLOAD};
use crate::types::ControlSymbol;

/// Receiver state
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum RxState {
    /// Waiting for START
    #[default]
    Idle,
    /// START seen, no data yet
    StartSeen,
    /// Collecting units
    Receiving {
        /// Wire values received so far (LEN, payload, checksum)
        units: Vec<u8, FRAME_CAPACITY>,
        /// High group waiting for its low group (split scheme only)
        pending_high: Option<u8>,
    },
}

impl RxState {
    /// Whether the receiver is waiting for START
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether a frame is in progress
    #[must_use]
    pub const fn in_frame(&self) -> bool {
        !self.is_idle()
    }

    /// Units collected in the current frame
    #[must_use]
    pub fn units_received(&self) -> usize {
        match self {
            Self::Receiving { units, .. } => units.len(),
            _ => 0,
        }
    }
}

/// A frame delivered at STOP
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Decoded payload
    pub payload: Vec<u8, MAX_PAYLOAD>,
    /// Checksum received on the wire
    pub checksum: u8,
    /// Checksum recomputed over the received payload
    pub expected_checksum: u8,
    /// Received and recomputed checksums agree
    pub checksum_ok: bool,
    /// LEN unit received (explicit framing only)
    pub declared_len: Option<u8>,
    /// LEN agrees with the payload count (always true for implicit framing)
    pub length_ok: bool,
}

impl ReceivedFrame {
    /// Checksum and length both verified
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.checksum_ok && self.length_ok
    }
}

/// Result of one receiver step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RxOutcome {
    /// Nothing to report yet
    Pending,
    /// START then STOP without enough units for a frame
    NoFrame,
    /// A complete frame (checksum failures are flagged, not dropped)
    Frame(ReceivedFrame),
    /// Too many units; the frame was dropped
    Overflow,
}

/// Advance the receiver by one classified symbol
#[must_use]
pub fn step(
    state: RxState,
    scheme: &SymbolScheme,
    mode: LengthMode,
    input: Classified,
) -> (RxState, RxOutcome) {
    use Classified::{Control, Data, Noise};

    match (state, input) {
        (_, Control(ControlSymbol::Start)) => (RxState::StartSeen, RxOutcome::Pending),

        (RxState::Idle, _) => (RxState::Idle, RxOutcome::Pending),

        (RxState::StartSeen, Control(ControlSymbol::Stop)) => {
            trace!("START then STOP, no frame");
            (RxState::Idle, RxOutcome::NoFrame)
        }
        (RxState::StartSeen, Data(group, duty)) => {
            let fresh = RxState::Receiving {
                units: Vec::new(),
                pending_high: None,
            };
            accept_data(fresh, scheme, group, duty)
        }
        (state @ RxState::StartSeen, Control(ControlSymbol::Idle) | Noise) => {
            (state, RxOutcome::Pending)
        }

        (RxState::Receiving { units, .. }, Control(ControlSymbol::Stop)) => {
            (RxState::Idle, finish(&units, scheme, mode))
        }
        (state @ RxState::Receiving { .. }, Data(group, duty)) => {
            accept_data(state, scheme, group, duty)
        }
        (state @ RxState::Receiving { .. }, Control(ControlSymbol::Idle) | Noise) => {
            (state, RxOutcome::Pending)
        }
    }
}

fn accept_data(
    state: RxState,
    scheme: &SymbolScheme,
    group: DataGroup,
    duty: f32,
) -> (RxState, RxOutcome) {
    let (mut units, pending_high) = match state {
        RxState::Receiving {
            units,
            pending_high,
        } => (units, pending_high),
        other => return (other, RxOutcome::Pending),
    };

    let value = scheme.decode_group(group, duty);
    let (unit, pending_high) = match group {
        DataGroup::Whole => (Some(value), None),
        // A newer high group replaces an unpaired one
        DataGroup::High => (None, Some(value)),
        DataGroup::Low => match pending_high {
            Some(high) => (Some(SymbolScheme::combine(high, value)), None),
            // Orphan low group
            None => (None, None),
        },
    };

    if let Some(unit) = unit {
        if units.push(unit).is_err() {
            warn!("receive buffer overflow, frame dropped");
            return (RxState::Idle, RxOutcome::Overflow);
        }
    }
    (RxState::Receiving { units, pending_high }, RxOutcome::Pending)
}

fn finish(units: &[u8], scheme: &SymbolScheme, mode: LengthMode) -> RxOutcome {
    let split = match mode {
        LengthMode::Implicit => Some((None, units)),
        LengthMode::Explicit => units.split_first().map(|(&len, rest)| (Some(len), rest)),
    };
    let Some((declared_len, Some((&checksum, wire)))) =
        split.map(|(len, body)| (len, body.split_last()))
    else {
        trace!("STOP with {} units, no frame", units.len());
        return RxOutcome::NoFrame;
    };
    if wire.len() > MAX_PAYLOAD {
        warn!("frame of {} units exceeds payload limit", wire.len());
        return RxOutcome::Overflow;
    }

    let expected_checksum = scheme.checksum_wire(wire);
    let length_ok = declared_len.map_or(true, |len| {
        u8::try_from(wire.len()).is_ok_and(|count| scheme.reduce(count) == len)
    });

    RxOutcome::Frame(ReceivedFrame {
        payload: wire.iter().map(|&v| scheme.from_wire(v)).collect(),
        checksum,
        expected_checksum,
        checksum_ok: scheme.reduce(checksum) == expected_checksum,
        declared_len,
        length_ok,
    })
}

/// Receiver bundling the state machine with its classifier settings
///
/// Feed it one measured duty per symbol.
#[derive(Clone, Debug)]
pub struct Receiver {
    state: RxState,
    scheme: SymbolScheme,
    controls: ControlSet,
    mode: LengthMode,
}

impl Receiver {
    /// Create an idle receiver
    #[must_use]
    pub fn new(scheme: SymbolScheme, controls: ControlSet, mode: LengthMode) -> Self {
        Self {
            state: RxState::Idle,
            scheme,
            controls,
            mode,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &RxState {
        &self.state
    }

    /// Classify a measured duty and step the state machine
    pub fn feed(&mut self, duty: f32) -> RxOutcome {
        let input = classify(duty, &self.controls, &self.scheme);
        self.feed_classified(input)
    }

    /// Step the state machine with an already classified symbol
    pub fn feed_classified(&mut self, input: Classified) -> RxOutcome {
        let state = core::mem::take(&mut self.state);
        let (next, outcome) = step(state, &self.scheme, self.mode, input);
        self.state = next;
        outcome
    }

    /// Drop any frame in progress
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
    }
}
