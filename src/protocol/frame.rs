//! Frame schedule
//!
//! The transmit side of a frame: every level the output is set to, in order,
//! with how many PWM periods it is held. Built once per transaction so the
//! loopback and half-duplex paths send exactly the same thing.

use heapless::Vec;

use crate::codec::SymbolScheme;
use crate::config::{LengthMode, LinkConfig, IDLE_LEAD_CYCLES, IDLE_TAIL_CYCLES, MAX_PAYLOAD};
use crate::types::ControlSymbol;

/// Most segments a frame can have: guards and controls plus two symbols per
/// unit for LEN, payload and checksum
pub const MAX_SEGMENTS: usize = 4 + 2 * (MAX_PAYLOAD + 2);

/// Role of a segment in the frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// Leading or trailing guard
    Idle,
    /// Frame start marker
    Start,
    /// Payload length unit (explicit framing only)
    Len,
    /// Payload unit
    Data,
    /// Checksum unit
    Checksum,
    /// Frame end marker
    Stop,
}

impl SegmentKind {
    /// Whether the segment carries a quantized data symbol
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Len | Self::Data | Self::Checksum)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SegmentKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Start => defmt::write!(f, "START"),
            Self::Len => defmt::write!(f, "LEN"),
            Self::Data => defmt::write!(f, "DATA"),
            Self::Checksum => defmt::write!(f, "CHK"),
            Self::Stop => defmt::write!(f, "STOP"),
        }
    }
}

/// One held output level
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Role in the frame
    pub kind: SegmentKind,
    /// Output duty
    pub duty: f32,
    /// PWM periods to hold it
    pub cycles: u8,
}

/// Complete transmit schedule for one frame
#[derive(Clone, Debug)]
pub struct FrameSchedule {
    segments: Vec<Segment, MAX_SEGMENTS>,
    wire: Vec<u8, MAX_PAYLOAD>,
    checksum: u8,
}

impl FrameSchedule {
    /// Build the schedule for `payload`, truncated to [`MAX_PAYLOAD`] bytes
    #[must_use]
    pub fn build(config: &LinkConfig, payload: &[u8]) -> Self {
        let scheme = config.scheme();
        let controls = config.controls();
        let payload = &payload[..payload.len().min(MAX_PAYLOAD)];

        let wire: Vec<u8, MAX_PAYLOAD> = payload.iter().map(|&b| scheme.to_wire(b)).collect();
        let checksum = scheme.checksum_wire(&wire);

        let mut schedule = Self {
            segments: Vec::new(),
            wire,
            checksum,
        };

        schedule.push(SegmentKind::Idle, controls.duty(ControlSymbol::Idle), IDLE_LEAD_CYCLES);
        schedule.push(SegmentKind::Start, controls.duty(ControlSymbol::Start), config.symbol_cycles());

        if config.length_mode() == LengthMode::Explicit {
            // Count is at most MAX_PAYLOAD, so it fits a byte
            let count = u8::try_from(payload.len()).unwrap_or(u8::MAX);
            schedule.push_unit(&scheme, SegmentKind::Len, scheme.reduce(count), config.data_cycles());
        }
        for i in 0..schedule.wire.len() {
            let value = schedule.wire[i];
            schedule.push_unit(&scheme, SegmentKind::Data, value, config.data_cycles());
        }
        schedule.push_unit(&scheme, SegmentKind::Checksum, checksum, config.data_cycles());

        schedule.push(SegmentKind::Stop, controls.duty(ControlSymbol::Stop), config.symbol_cycles());
        schedule.push(SegmentKind::Idle, controls.duty(ControlSymbol::Idle), IDLE_TAIL_CYCLES);
        schedule
    }

    fn push(&mut self, kind: SegmentKind, duty: f32, cycles: u8) {
        // Capacity covers the largest frame
        let _ = self.segments.push(Segment { kind, duty, cycles });
    }

    fn push_unit(&mut self, scheme: &SymbolScheme, kind: SegmentKind, value: u8, cycles: u8) {
        for duty in scheme.encode_wire(value) {
            self.push(kind, duty, cycles);
        }
    }

    /// Segments in transmit order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Payload wire values (after truncation)
    #[must_use]
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Number of payload units sent
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.wire.len()
    }

    /// Checksum sent
    #[must_use]
    pub const fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Total PWM periods the frame occupies
    #[must_use]
    pub fn total_cycles(&self) -> u32 {
        self.segments.iter().map(|s| u32::from(s.cycles)).sum()
    }

    /// Nominal air time at the given PWM period
    #[must_use]
    pub fn duration_us(&self, period_us: u64) -> u64 {
        u64::from(self.total_cycles()) * period_us
    }

    /// Data-carrying segments only
    pub fn data_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.kind.is_data())
    }
}
