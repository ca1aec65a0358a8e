//! Link driver
//!
//! Owns the output, the input and the clock for the duration of a
//! transaction (`&mut self` on every operation), so nothing else can touch
//! the line while a frame is on it.

use heapless::Vec;

use super::report::{TransactionReport, Verdict};
use super::LinkError;
use crate::codec::UnitDuties;
use crate::config::{LinkConfig, FRAME_CAPACITY, MAX_PAYLOAD};
use crate::hal::timer::{busy_wait_until, Stopwatch};
use crate::hal::{busy_wait_us, Clock, Deadline, DutyOutput, LevelInput};
use crate::meter::{
    cycle_timeout_us, measure_duty_avg, measure_next_cycle, measure_one_cycle, CycleSample,
    DutyAccumulator, MeasureError,
};
use crate::protocol::{Classified, FrameSchedule, ReceivedFrame, Receiver, RxOutcome, SegmentKind};
use crate::types::{ControlSymbol, DutyRatio};

/// What one attempt read back
#[derive(Default)]
struct Capture {
    rx: Vec<u8, MAX_PAYLOAD>,
    rx_len: Option<u8>,
    rx_checksum: Option<u8>,
}

/// Drives one endpoint of the duty link
pub struct LinkDriver<O, I, C> {
    output: O,
    input: I,
    clock: C,
    config: LinkConfig,
}

impl<O, I, C> LinkDriver<O, I, C>
where
    O: DutyOutput,
    I: LevelInput,
    C: Clock,
{
    /// Create a driver; the output is set to IDLE straight away
    pub fn new(output: O, input: I, clock: C, config: LinkConfig) -> Self {
        let mut driver = Self {
            output,
            input,
            clock,
            config,
        };
        driver.idle();
        driver
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: LinkConfig) {
        self.config = config;
    }

    /// Give back the collaborators
    pub fn release(self) -> (O, I, C) {
        (self.output, self.input, self.clock)
    }

    /// Set the output duty
    pub fn set_duty(&mut self, duty: f32) {
        self.output.set_ratio(DutyRatio::new(duty));
    }

    /// Put the line in IDLE
    pub fn idle(&mut self) {
        self.set_duty(self.config.controls().duty(ControlSymbol::Idle));
    }

    /// Set a duty and keep it for `cycles` PWM periods
    pub fn hold(&mut self, duty: f32, cycles: u8) {
        self.set_duty(duty);
        busy_wait_us(&self.clock, self.config.period_us() * u64::from(cycles));
    }

    /// Measure the incoming duty, averaged over the configured cycle count
    ///
    /// # Errors
    ///
    /// See [`measure_duty_avg`].
    pub fn measure_duty(&mut self) -> Result<f32, MeasureError> {
        measure_duty_avg(
            &mut self.input,
            &self.clock,
            self.config.period_us(),
            self.config.measure_cycles(),
        )
    }

    /// Set a duty, let it settle and measure it back (loopback)
    ///
    /// # Errors
    ///
    /// See [`measure_duty_avg`].
    pub fn send_and_measure(&mut self, duty: f32) -> Result<f32, MeasureError> {
        self.set_duty(duty);
        busy_wait_us(&self.clock, self.config.loopback_guard_us());
        self.measure_duty()
    }

    /// Send `payload` over a loopback jumper and check what comes back
    ///
    /// The payload is truncated to [`MAX_PAYLOAD`] bytes. The whole frame is
    /// retried up to the configured limit; the report describes the last
    /// attempt.
    pub fn transact(&mut self, payload: &[u8]) -> TransactionReport {
        let schedule = FrameSchedule::build(&self.config, payload);
        let stopwatch = Stopwatch::started(&self.clock);
        info!(
            "loopback: {} bytes, {}",
            schedule.payload_len(),
            self.config.scheme().kind()
        );

        let mut retries = 0u8;
        loop {
            let mut capture = Capture::default();
            let error = self.loopback_attempt(&schedule, &mut capture).err();
            let passed = error.is_none() && self.capture_matches(&schedule, payload, &capture);

            if passed || retries >= self.config.max_retries() {
                let verdict = if passed { Verdict::Pass } else { Verdict::Fail };
                return self.finish(verdict, retries, payload, &schedule, capture, error, &stopwatch);
            }

            warn!(
                "attempt {} failed: chk tx={} rx={}",
                retries + 1,
                schedule.checksum(),
                capture.rx_checksum
            );
            retries += 1;
            self.pause_before_retry();
        }
    }

    fn loopback_attempt(
        &mut self,
        schedule: &FrameSchedule,
        capture: &mut Capture,
    ) -> Result<(), LinkError> {
        let scheme = self.config.scheme();
        let per_unit = scheme.symbols_per_unit();
        let mut unit = UnitDuties::new();

        for segment in schedule.segments() {
            if !segment.kind.is_data() {
                self.hold(segment.duty, segment.cycles);
                continue;
            }

            let measured = match self.send_and_measure(segment.duty) {
                Ok(duty) => duty,
                Err(e) => {
                    debug!("loopback measurement failed: {}", e);
                    self.idle();
                    return Err(e.into());
                }
            };
            let _ = unit.push(measured);
            if unit.len() < per_unit {
                continue;
            }

            let value = scheme.decode_wire(&unit);
            unit.clear();
            match segment.kind {
                SegmentKind::Len => capture.rx_len = Some(value),
                SegmentKind::Checksum => capture.rx_checksum = Some(value),
                _ => {
                    let _ = capture.rx.push(scheme.from_wire(value));
                }
            }
        }
        Ok(())
    }

    fn capture_matches(&self, schedule: &FrameSchedule, payload: &[u8], capture: &Capture) -> bool {
        let scheme = self.config.scheme();
        let sent = &payload[..schedule.payload_len()];
        let length_ok = capture.rx_len.map_or(true, |len| {
            u8::try_from(schedule.payload_len()).is_ok_and(|count| scheme.reduce(count) == len)
        });
        capture.rx.as_slice() == sent
            && capture.rx_checksum == Some(schedule.checksum())
            && length_ok
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        verdict: Verdict,
        retries: u8,
        payload: &[u8],
        schedule: &FrameSchedule,
        capture: Capture,
        error: Option<LinkError>,
        stopwatch: &Stopwatch,
    ) -> TransactionReport {
        match verdict {
            Verdict::Pass => info!("PASS after {} retries", retries),
            Verdict::Fail => error!("FAIL after {} attempts", retries + 1),
        }
        TransactionReport {
            verdict,
            retries,
            tx: payload[..schedule.payload_len()].iter().copied().collect(),
            rx: capture.rx,
            tx_checksum: schedule.checksum(),
            rx_checksum: capture.rx_checksum,
            error,
            elapsed_us: stopwatch.elapsed_us(&self.clock),
        }
    }

    fn pause_before_retry(&mut self) {
        self.idle();
        busy_wait_us(&self.clock, self.config.retry_delay_us());
    }

    /// Transmit one frame (half-duplex)
    ///
    /// Segment boundaries are timed from a single start instant so hold
    /// times do not accumulate drift over a long frame.
    pub fn send_frame(&mut self, payload: &[u8]) -> FrameSchedule {
        let schedule = FrameSchedule::build(&self.config, payload);
        let period = self.config.period_us();
        debug!("sending frame: {} units", schedule.payload_len());

        let mut at = self.clock.now_us();
        for segment in schedule.segments() {
            self.set_duty(segment.duty);
            at = at.saturating_add(period * u64::from(segment.cycles));
            busy_wait_until(&self.clock, Deadline::at(at));
        }
        schedule
    }

    /// Listen for one frame (half-duplex)
    ///
    /// Waits up to the listen timeout for START, follows START period by
    /// period to find where the first data slot begins, then averages the
    /// settled periods of every slot and feeds the receiver until STOP.
    /// START then STOP carries no frame and is skipped.
    ///
    /// # Errors
    ///
    /// - [`LinkError::FrameTimeout`] if no frame starts before the listen
    ///   timeout or STOP never follows
    /// - [`LinkError::Measure`] if the line goes quiet mid-frame
    /// - [`LinkError::Overflow`] for an oversized frame
    pub fn receive_frame(&mut self) -> Result<ReceivedFrame, LinkError> {
        let listen = Deadline::after(&self.clock, self.config.listen_timeout_us());
        loop {
            let start = self.await_start(listen)?;
            let first = self.follow_start(start, listen)?;
            if let Some(frame) = self.read_slots(first)? {
                return Ok(frame);
            }
            trace!("empty frame skipped");
        }
    }

    fn is_start(&self, sample: &CycleSample) -> bool {
        self.config.controls().match_duty(sample.duty()) == Some(ControlSymbol::Start)
    }

    fn await_start(&mut self, listen: Deadline) -> Result<CycleSample, LinkError> {
        let timeout = cycle_timeout_us(self.config.period_us());
        loop {
            if listen.expired(&self.clock) {
                debug!("no START before listen timeout");
                return Err(LinkError::FrameTimeout);
            }
            // A quiet line times out here; keep listening
            if let Ok(sample) = measure_one_cycle(&mut self.input, &self.clock, timeout) {
                if self.is_start(&sample) {
                    return Ok(sample);
                }
            }
        }
    }

    fn follow_start(
        &mut self,
        mut last: CycleSample,
        listen: Deadline,
    ) -> Result<CycleSample, LinkError> {
        let timeout = cycle_timeout_us(self.config.period_us());
        loop {
            if listen.expired(&self.clock) {
                return Err(LinkError::FrameTimeout);
            }
            let sample = measure_next_cycle(&mut self.input, &self.clock, last.next_rise_us(), timeout)?;
            if !self.is_start(&sample) {
                return Ok(sample);
            }
            last = sample;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_slots(&mut self, first: CycleSample) -> Result<Option<ReceivedFrame>, LinkError> {
        let timeout = cycle_timeout_us(self.config.period_us());
        let slot = u32::from(self.config.data_cycles().max(1));
        let guard = u32::from(self.config.slot_guard_cycles());
        let max_periods = (2 * FRAME_CAPACITY as u32 + 2) * slot;

        let mut receiver = Receiver::new(
            self.config.scheme(),
            self.config.controls(),
            self.config.length_mode(),
        );
        let _ = receiver.feed_classified(Classified::Control(ControlSymbol::Start));

        let mut acc = DutyAccumulator::new();
        let mut sample = first;
        for n in 0..max_periods {
            if n > 0 {
                sample = measure_next_cycle(&mut self.input, &self.clock, sample.next_rise_us(), timeout)?;
            }
            let pos = n % slot;
            if pos >= guard {
                acc.push(sample);
            }
            if pos + 1 < slot {
                continue;
            }

            let duty = acc.duty()?;
            acc = DutyAccumulator::new();
            match receiver.feed(duty) {
                RxOutcome::Pending => {}
                RxOutcome::Frame(frame) => {
                    debug!("frame received: {} bytes", frame.payload.len());
                    return Ok(Some(frame));
                }
                RxOutcome::NoFrame => return Ok(None),
                RxOutcome::Overflow => return Err(LinkError::Overflow),
            }
        }
        warn!("no STOP after {} periods", max_periods);
        Err(LinkError::FrameTimeout)
    }

    /// Send `payload` and wait for the peer to echo it back (half-duplex)
    ///
    /// Passes when the echo carries the same bytes and a valid checksum.
    /// Retried like [`transact`](Self::transact).
    pub fn request(&mut self, payload: &[u8]) -> TransactionReport {
        let stopwatch = Stopwatch::started(&self.clock);
        info!("request: {} bytes", payload.len().min(MAX_PAYLOAD));

        let mut retries = 0u8;
        loop {
            let schedule = self.send_frame(payload);
            let mut capture = Capture::default();
            let (passed, error) = match self.receive_frame() {
                Ok(frame) => {
                    let sent = &payload[..schedule.payload_len()];
                    let passed = frame.is_valid()
                        && frame.checksum == schedule.checksum()
                        && frame.payload.as_slice() == sent;
                    capture.rx = frame.payload;
                    capture.rx_len = frame.declared_len;
                    capture.rx_checksum = Some(frame.checksum);
                    (passed, None)
                }
                Err(e) => (false, Some(e)),
            };

            if passed || retries >= self.config.max_retries() {
                let verdict = if passed { Verdict::Pass } else { Verdict::Fail };
                return self.finish(verdict, retries, payload, &schedule, capture, error, &stopwatch);
            }

            warn!("request attempt {} failed", retries + 1);
            retries += 1;
            self.pause_before_retry();
        }
    }

    /// Receive one frame and send its payload straight back (half-duplex peer)
    ///
    /// Frames with a bad checksum are echoed too; the requester sees the
    /// mismatch and retries.
    ///
    /// # Errors
    ///
    /// See [`receive_frame`](Self::receive_frame). Nothing is sent on error.
    pub fn serve_echo(&mut self) -> Result<ReceivedFrame, LinkError> {
        let frame = self.receive_frame()?;
        if !frame.checksum_ok {
            warn!(
                "echoing frame with bad checksum: rx={} expected={}",
                frame.checksum,
                frame.expected_checksum
            );
        }
        self.send_frame(&frame.payload);
        Ok(frame)
    }
}
