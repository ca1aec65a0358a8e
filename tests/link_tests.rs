//! Link Driver Tests
//!
//! End-to-end transactions over the simulated line: loopback with retries,
//! half-duplex frames and report formatting.
//! Run with: cargo test --features std --test link_tests

use duty_link::config::{LengthMode, LinkConfig, MAX_PAYLOAD};
use duty_link::hal::DutyOutput;
use duty_link::link::{ByteDiff, HexDiff, LinkDriver, LinkError, TransactionReport, Verdict};
use duty_link::meter::MeasureError;
use duty_link::protocol::FrameSchedule;
use duty_link::sim::SimLine;
use duty_link::types::{DutyBand, DutyRatio};

const START: f32 = 0.97;
const IDLE: f32 = 0.05;

fn loopback_driver(line: &SimLine, cfg: LinkConfig) -> LinkDriver<&SimLine, &SimLine, &SimLine> {
    LinkDriver::new(line, line, line, cfg)
}

/// Segments of a frame as a script for the simulated input
fn script(cfg: &LinkConfig, payload: &[u8]) -> Vec<(f32, u32)> {
    FrameSchedule::build(cfg, payload)
        .segments()
        .iter()
        .map(|s| (s.duty, u32::from(s.cycles)))
        .collect()
}

/// Output that cuts the return path for the first few frames
///
/// Each START write begins a new attempt; attempts up to `bad_attempts`
/// see a receiver stuck low.
struct FlakyOutput<'a> {
    line: &'a SimLine,
    starts: u32,
    bad_attempts: u32,
}

impl DutyOutput for FlakyOutput<'_> {
    fn set_ratio(&mut self, ratio: DutyRatio) {
        if (ratio.fraction() - START).abs() < 1e-6 {
            self.starts += 1;
            let stuck = (self.starts <= self.bad_attempts).then_some(false);
            self.line.set_stuck(stuck);
        }
        self.line.set_duty(ratio.fraction());
    }
}

// =============================================================================
// Loopback Tests
// =============================================================================

#[test]
fn test_driver_starts_idle() {
    let line = SimLine::new(1_000);
    let _driver = loopback_driver(&line, LinkConfig::default());
    assert!((line.requested_duty() - IDLE).abs() < f32::EPSILON);
}

#[test]
fn test_send_and_measure() {
    let line = SimLine::new(1_000);
    let mut driver = loopback_driver(&line, LinkConfig::default());
    let measured = driver.send_and_measure(0.4).unwrap();
    assert!((measured - 0.4).abs() < 0.002);
}

#[test]
fn test_loopback_alphabet_passes() {
    let line = SimLine::new(1_000);
    let mut driver = loopback_driver(&line, LinkConfig::alphabet_loopback());
    let report = driver.transact(b"Hello duty link");

    assert_eq!(report.verdict, Verdict::Pass, "\n{report}");
    assert_eq!(report.retries, 0);
    assert_eq!(report.rx.as_slice(), b"Hello duty link");
    assert_eq!(report.rx_checksum, Some(report.tx_checksum));
    assert_eq!(report.error, None);
    assert!(report.elapsed_us > 0);
    assert!(report.to_string().ends_with("RESULT: BYTES=OK  CHK=OK  => PASS"));
    // Line is left idle
    assert!((line.requested_duty() - IDLE).abs() < f32::EPSILON);
}

#[test]
fn test_loopback_split_passes() {
    let line = SimLine::new(1_000);
    let mut driver = loopback_driver(&line, LinkConfig::split7());
    let report = driver.transact(b"Hi, #42!");
    assert!(report.passed(), "\n{report}");
    assert_eq!(report.rx.as_slice(), b"Hi, #42!");
}

#[test]
fn test_loopback_bytes_pass() {
    // 8-bit bins need the finer timing of a slower PWM
    let cfg = LinkConfig::byte_frame().with_pwm_frequency(250);
    let line = SimLine::new(cfg.period_us());
    let mut driver = loopback_driver(&line, cfg);
    let payload = [0x00, 0x7F, 0x80, 0xFF, b'A'];
    let report = driver.transact(&payload);
    assert!(report.passed(), "\n{report}");
    assert_eq!(report.rx.as_slice(), &payload);
}

#[test]
fn test_loopback_digit_alphabet_passes() {
    let cfg = LinkConfig::alphabet_loopback()
        .with_alphabet_table(DutyBand::WIDE, b"0123456789")
        .unwrap()
        .with_length_mode(LengthMode::Explicit);
    let line = SimLine::new(cfg.period_us());
    let mut driver = loopback_driver(&line, cfg);
    let report = driver.transact(b"31415926535");

    assert!(report.passed(), "\n{report}");
    assert_eq!(report.rx.as_slice(), b"31415926535");
    // XOR of the digits is 12, which wraps to 2
    assert_eq!(report.tx_checksum, 2);
    assert_eq!(report.rx_checksum, Some(2));
}

#[test]
fn test_loopback_survives_glitches() {
    let line = SimLine::new(1_000);
    line.set_glitch_every(Some(7));
    let mut driver = loopback_driver(&line, LinkConfig::alphabet_loopback());
    let report = driver.transact(b"Glitch test");
    assert!(report.passed(), "\n{report}");
}

#[test]
fn test_loopback_unknown_characters() {
    let line = SimLine::new(1_000);
    let mut driver = loopback_driver(&line, LinkConfig::alphabet_loopback());
    // '#' is not in the table and comes back as 'A'
    let report = driver.transact(b"a#b");
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.rx.as_slice(), b"aAb");
    assert_eq!(report.diff().collect::<Vec<_>>(), [ByteDiff {
        index: 1,
        tx: Some(b'#'),
        rx: Some(b'A'),
    }]);
}

#[test]
fn test_loopback_truncates_payload() {
    let line = SimLine::new(1_000);
    let mut driver = loopback_driver(&line, LinkConfig::alphabet_loopback());
    let payload = [b'x'; 300];
    let report = driver.transact(&payload);
    assert!(report.passed(), "\n{report}");
    assert_eq!(report.tx.len(), MAX_PAYLOAD);
    assert_eq!(report.rx.len(), MAX_PAYLOAD);
}

// =============================================================================
// Retry Tests
// =============================================================================

#[test]
fn test_retry_until_return_path_recovers() {
    let line = SimLine::new(1_000);
    let output = FlakyOutput {
        line: &line,
        starts: 0,
        bad_attempts: 3,
    };
    let cfg = LinkConfig::alphabet_loopback();
    let mut driver = LinkDriver::new(output, &line, &line, cfg);

    let report = driver.transact(b"Retry me");
    assert_eq!(report.verdict, Verdict::Pass, "\n{report}");
    assert_eq!(report.retries, 3);
    assert_eq!(report.rx.as_slice(), b"Retry me");
    assert!(report.elapsed_us >= 3 * cfg.retry_delay_us());

    let (output, _, _) = driver.release();
    assert_eq!(output.starts, 4);
}

#[test]
fn test_retries_exhausted() {
    let line = SimLine::new(1_000);
    line.set_stuck(Some(false));
    let mut driver = loopback_driver(&line, LinkConfig::alphabet_loopback());

    let report = driver.transact(b"Hi");
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.retries, 3);
    assert_eq!(report.error, Some(LinkError::Measure(MeasureError::Timeout)));
    assert!(report.rx.is_empty());
    assert_eq!(report.rx_checksum, None);
    assert!(!report.bytes_ok());
    assert!(!report.checksum_ok());
    assert_eq!(report.mismatches(), 2);

    let text = report.to_string();
    assert!(text.contains("TX: \"Hi\""));
    assert!(text.contains("RX: \"\""));
    assert!(text.contains("rx=-- => FAIL"));
    assert!(text.contains("RESULT: BYTES=FAIL  CHK=FAIL  => FAIL"));
    assert!(text.contains("ERROR: measurement failed: timeout waiting for edge"));
    assert!(text.contains("RETRIES: 3"));
    assert!(text.contains("DIFF @0: tx=48 rx=--"));
    assert!(text.contains("DIFF @1: tx=69 rx=--"));
}

#[test]
fn test_zero_retries_fails_fast() {
    let line = SimLine::new(1_000);
    line.set_stuck(Some(false));
    let cfg = LinkConfig::alphabet_loopback().with_max_retries(0);
    let mut driver = loopback_driver(&line, cfg);
    let report = driver.transact(b"Hi");
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.retries, 0);
    assert!(!report.to_string().contains("RETRIES"));
}

// =============================================================================
// Half-Duplex Tests
// =============================================================================

#[test]
fn test_receive_scripted_frame() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    line.play(0, &script(&cfg, b"Hi there"));

    let mut driver = loopback_driver(&line, cfg);
    let frame = driver.receive_frame().unwrap();
    assert_eq!(frame.payload.as_slice(), b"Hi there");
    assert!(frame.is_valid());
}

#[test]
fn test_receive_split_frame_mid_period() {
    let cfg = LinkConfig::half_duplex().with_scheme(LinkConfig::split7().scheme());
    let line = SimLine::new(cfg.period_us());
    line.play(3_500, &script(&cfg, b"Split?"));

    let mut driver = loopback_driver(&line, cfg);
    let frame = driver.receive_frame().unwrap();
    assert_eq!(frame.payload.as_slice(), b"Split?");
    assert!(frame.checksum_ok);
}

#[test]
fn test_receive_skips_empty_frame() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    let mut segments = vec![(IDLE, 2), (START, 4), (0.88, 4)];
    segments.extend(script(&cfg, b"ok"));
    line.play(0, &segments);

    let mut driver = loopback_driver(&line, cfg);
    let frame = driver.receive_frame().unwrap();
    assert_eq!(frame.payload.as_slice(), b"ok");
    assert!(frame.is_valid());
}

#[test]
fn test_receive_lone_empty_frame_times_out() {
    let cfg = LinkConfig::half_duplex().with_listen_timeout_us(30_000);
    let line = SimLine::new(cfg.period_us());
    line.play(0, &[(IDLE, 2), (START, 4), (0.88, 4), (IDLE, 1)]);

    let mut driver = loopback_driver(&line, cfg);
    assert_eq!(driver.receive_frame(), Err(LinkError::FrameTimeout));
}

#[test]
fn test_receive_line_drops_mid_frame() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    line.play(0, &[(IDLE, 2), (START, 4), (0.4, 4)]);

    let mut driver = loopback_driver(&line, cfg);
    assert_eq!(
        driver.receive_frame(),
        Err(LinkError::Measure(MeasureError::Timeout))
    );
}

#[test]
fn test_listen_timeout() {
    let cfg = LinkConfig::half_duplex().with_listen_timeout_us(20_000);
    let line = SimLine::new(cfg.period_us());
    let mut driver = loopback_driver(&line, cfg);

    // The input follows our own IDLE output: never a START
    assert_eq!(driver.receive_frame(), Err(LinkError::FrameTimeout));
    assert!(line.peek_us() < 20_000 + 6 * cfg.period_us());
}

#[test]
fn test_send_frame_timing() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    let mut driver = loopback_driver(&line, cfg);
    let writes_before = line.duty_writes();

    let before = line.peek_us();
    let schedule = driver.send_frame(b"Hi");
    let elapsed = line.peek_us() - before;

    assert_eq!(line.duty_writes() - writes_before, schedule.segments().len() as u64);
    assert!(elapsed >= schedule.duration_us(cfg.period_us()));
    assert!(elapsed <= schedule.duration_us(cfg.period_us()) + 2);
    assert!((line.requested_duty() - IDLE).abs() < f32::EPSILON);
}

#[test]
fn test_request_with_echo() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    let tx_time = FrameSchedule::build(&cfg, b"Echo").duration_us(cfg.period_us());
    // The peer answers a few periods after our frame ends
    line.play(tx_time + 3 * cfg.period_us(), &script(&cfg, b"Echo"));

    let mut driver = loopback_driver(&line, cfg);
    let report = driver.request(b"Echo");
    assert_eq!(report.verdict, Verdict::Pass, "\n{report}");
    assert_eq!(report.retries, 0);
    assert_eq!(report.rx.as_slice(), b"Echo");
}

#[test]
fn test_request_with_wrong_echo_fails() {
    let cfg = LinkConfig::half_duplex()
        .with_max_retries(0)
        .with_listen_timeout_us(200_000);
    let line = SimLine::new(cfg.period_us());
    let tx_time = FrameSchedule::build(&cfg, b"Echo").duration_us(cfg.period_us());
    line.play(tx_time + 3 * cfg.period_us(), &script(&cfg, b"Echo."));

    let mut driver = loopback_driver(&line, cfg);
    let report = driver.request(b"Echo");
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.rx.as_slice(), b"Echo.");
    assert_eq!(report.error, None);
}

#[test]
fn test_serve_echo_sends_payload_back() {
    let cfg = LinkConfig::half_duplex();
    let line = SimLine::new(cfg.period_us());
    line.play(0, &script(&cfg, b"ping"));

    let mut driver = loopback_driver(&line, cfg);
    let writes_before = line.duty_writes();
    let frame = driver.serve_echo().unwrap();

    assert_eq!(frame.payload.as_slice(), b"ping");
    let echoed = FrameSchedule::build(&cfg, b"ping");
    assert_eq!(line.duty_writes() - writes_before, echoed.segments().len() as u64);
    assert!((line.requested_duty() - IDLE).abs() < f32::EPSILON);
}

#[test]
fn test_serve_echo_sends_nothing_on_error() {
    let cfg = LinkConfig::half_duplex().with_listen_timeout_us(10_000);
    let line = SimLine::new(cfg.period_us());
    let mut driver = loopback_driver(&line, cfg);
    let writes_before = line.duty_writes();

    assert_eq!(driver.serve_echo(), Err(LinkError::FrameTimeout));
    assert_eq!(line.duty_writes(), writes_before);
}

// =============================================================================
// Report Tests
// =============================================================================

fn report(tx: &[u8], rx: &[u8], verdict: Verdict) -> TransactionReport {
    TransactionReport {
        verdict,
        retries: 1,
        tx: tx.iter().copied().collect(),
        rx: rx.iter().copied().collect(),
        tx_checksum: 0x2A,
        rx_checksum: Some(0x2A),
        error: None,
        elapsed_us: 0,
    }
}

#[test]
fn test_report_diff_lines() {
    let r = report(b"Hello", b"Hellp", Verdict::Fail);
    let text = r.to_string();
    assert!(text.contains("CHK: tx=0x2A rx=0x2A => OK"));
    assert!(text.contains("RESULT: BYTES=FAIL  CHK=OK  => FAIL"));
    assert!(text.contains("RETRIES: 1"));
    assert!(text.contains("DIFF @4: tx=6F rx=70"));
    assert_eq!(r.mismatches(), 1);
}

#[test]
fn test_report_escapes_unprintable() {
    let r = report(b"a\"\x01", b"a\"\x01", Verdict::Pass);
    assert!(r.to_string().starts_with("TX: \"a\\x22\\x01\"\n"));
}

#[test]
fn test_pass_report_has_no_diff() {
    let r = report(b"same", b"same", Verdict::Pass);
    let text = r.to_string();
    assert!(!text.contains("DIFF"));
    assert!(!text.contains("RETRIES"));
}

#[test]
fn test_hex_diff_lengths() {
    let diffs: Vec<ByteDiff> = HexDiff::new(b"ab", b"abcd").collect();
    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0], ByteDiff { index: 2, tx: None, rx: Some(b'c') });
    assert_eq!(diffs[1].to_string(), "DIFF @3: tx=-- rx=64");
}

#[test]
fn test_error_display() {
    assert_eq!(LinkError::FrameTimeout.to_string(), "frame timeout");
    assert_eq!(LinkError::Overflow.to_string(), "frame overflow");
    assert_eq!(LinkError::from(MeasureError::Degenerate), LinkError::Measure(MeasureError::Degenerate));
}
