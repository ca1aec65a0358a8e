//! HAL Adapter Tests
//!
//! Tests for the embedded-hal pin and PWM adapters and the timer helpers.
//! Run with: cargo test --features std --test hal_tests

use std::io::ErrorKind;

use duty_link::hal::gpio::Polarity;
use duty_link::hal::pwm::{compare_level, level_ratio};
use duty_link::hal::timer::{busy_wait_until, Stopwatch};
use duty_link::hal::{busy_wait_us, Clock, Deadline, DutyOutput, LevelInput, PinInput, PwmOutput};
use duty_link::sim::SimLine;
use duty_link::types::DutyRatio;
use embedded_hal::pwm::{self, ErrorKind as PwmErrorKind, ErrorType, SetDutyCycle};
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
use embedded_hal_mock::eh1::MockError;

/// PWM channel recording every compare level written
struct RecordingChannel {
    max: u16,
    writes: Vec<u16>,
    fail: bool,
}

impl RecordingChannel {
    fn new(max: u16) -> Self {
        Self {
            max,
            writes: Vec::new(),
            fail: false,
        }
    }
}

#[derive(Debug)]
struct ChannelFault;

impl pwm::Error for ChannelFault {
    fn kind(&self) -> PwmErrorKind {
        PwmErrorKind::Other
    }
}

impl ErrorType for RecordingChannel {
    type Error = ChannelFault;
}

impl SetDutyCycle for RecordingChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail {
            return Err(ChannelFault);
        }
        self.writes.push(duty);
        Ok(())
    }
}

// =============================================================================
// PWM Output Tests
// =============================================================================

#[test]
fn test_compare_level_rounds_to_nearest() {
    assert_eq!(compare_level(DutyRatio::new(0.5), 999), 500);
    assert_eq!(compare_level(DutyRatio::new(0.05), 999), 50);
    assert_eq!(compare_level(DutyRatio::ZERO, 999), 0);
    assert_eq!(compare_level(DutyRatio::FULL, 999), 999);
    assert_eq!(compare_level(DutyRatio::FULL, 0), 0);
}

#[test]
fn test_level_ratio() {
    assert!((level_ratio(250, 1000).fraction() - 0.25).abs() < f32::EPSILON);
    assert_eq!(level_ratio(5, 0), DutyRatio::ZERO);
}

#[test]
fn test_pwm_output_writes_levels() {
    let mut out = PwmOutput::new(RecordingChannel::new(999));
    assert_eq!(out.level(), 0);

    out.set_ratio(DutyRatio::new(0.97));
    assert_eq!(out.level(), 969);
    assert_eq!(out.ratio(), DutyRatio::new(0.97));

    out.stop();
    let channel = out.release();
    assert_eq!(channel.writes, [0u16, 969, 0]);
}

#[test]
fn test_pwm_output_counts_failures() {
    let mut channel = RecordingChannel::new(999);
    channel.fail = true;
    let mut out = PwmOutput::new(channel);
    out.set_ratio(DutyRatio::new(0.5));
    assert_eq!(out.write_errors(), 2);
    // Failed writes leave the recorded state alone
    assert_eq!(out.level(), 0);
    assert_eq!(out.ratio(), DutyRatio::ZERO);
}

// =============================================================================
// Pin Input Tests
// =============================================================================

#[test]
fn test_pin_input_normal_polarity() {
    let pin = PinMock::new(&[
        PinTransaction::get(PinState::High),
        PinTransaction::get(PinState::Low),
    ]);
    let mut input = PinInput::new(pin);
    assert_eq!(input.polarity(), Polarity::Normal);
    assert!(input.is_high());
    assert!(!input.is_high());
    input.release().done();
}

#[test]
fn test_pin_input_inverted_polarity() {
    let pin = PinMock::new(&[
        PinTransaction::get(PinState::High),
        PinTransaction::get(PinState::Low),
    ]);
    let mut input = PinInput::with_polarity(pin, Polarity::Inverted);
    assert!(!input.is_high());
    assert!(input.is_high());
    input.release().done();
}

#[test]
fn test_pin_input_read_error_counts_as_low() {
    let pin = PinMock::new(&[
        PinTransaction::get(PinState::High).with_error(MockError::Io(ErrorKind::NotConnected)),
        PinTransaction::get(PinState::High),
    ]);
    let mut input = PinInput::new(pin);
    assert!(!input.is_high());
    assert_eq!(input.read_errors(), 1);
    assert!(input.is_high());
    input.release().done();
}

// =============================================================================
// Timer Tests
// =============================================================================

#[test]
fn test_deadline_expiry() {
    let line = SimLine::new(1_000);
    let deadline = Deadline::after(&line, 10);
    assert_eq!(deadline.at_us(), 11);
    assert!(!deadline.expired_at(10));
    assert!(deadline.expired_at(11));
    assert_eq!(deadline.remaining_us(&line), 9);
    assert_eq!(deadline.min(Deadline::at(5)), Deadline::at(5));
}

#[test]
fn test_deadline_saturates() {
    let line = SimLine::new(1_000);
    let deadline = Deadline::after(&line, u64::MAX);
    assert_eq!(deadline.at_us(), u64::MAX);
}

#[test]
fn test_busy_wait() {
    let line = SimLine::new(1_000);
    busy_wait_us(&line, 500);
    assert_eq!(line.peek_us(), 501);

    busy_wait_until(&line, Deadline::at(400));
    // Already expired: one clock read
    assert_eq!(line.peek_us(), 502);
}

#[test]
fn test_stopwatch() {
    let line = SimLine::new(1_000);
    let mut watch = Stopwatch::new();
    assert_eq!(watch.elapsed_us(&line), 0);

    watch.start(&line);
    line.advance(99);
    assert_eq!(watch.stop(&line), 100);
    assert_eq!(watch.elapsed_us(&line), 0);

    let running = Stopwatch::started(&line);
    assert_eq!(running.elapsed_us(&line), 1);
}

#[test]
fn test_sim_line_as_hal() {
    let line = SimLine::new(100);
    let mut output = &line;
    let mut input = &line;
    output.set_ratio(DutyRatio::new(0.5));
    line.advance(110);
    assert!(input.is_high());
    line.advance(50);
    assert!(!input.is_high());
    assert_eq!(line.now_us(), 161);
}
