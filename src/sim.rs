//! Simulated line
//!
//! A deterministic stand-in for the PWM pin, the input pin and the clock,
//! used to run the whole link on the host.
//!
//! - Time only moves when the clock is read: every [`Clock::now_us`] call
//!   advances it by one step (1 µs by default). Input reads are free.
//! - Duty changes take effect at the next period boundary, like a timer
//!   compare register latched on update.
//! - The input either follows the output (loopback) or a scripted waveform.
//! - Faults: flip every Nth read, or force the input to a fixed level.

use std::cell::{Cell, RefCell};
use std::vec::Vec;

use crate::hal::{Clock, DutyOutput, LevelInput};
use crate::types::DutyRatio;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Change {
    start_us: u64,
    duty: f32,
}

/// Duty history of one waveform, sorted by start time
#[derive(Debug)]
struct Timeline {
    changes: Vec<Change>,
}

impl Timeline {
    fn new() -> Self {
        Self {
            changes: vec![Change {
                start_us: 0,
                duty: 0.0,
            }],
        }
    }

    /// Duty in force at `t`
    fn duty_at(&self, t: u64) -> f32 {
        self.changes
            .iter()
            .rev()
            .find(|c| c.start_us <= t)
            .map_or(0.0, |c| c.duty)
    }

    /// Schedule `duty` from `start_us`, discarding anything planned after it
    fn set_from(&mut self, start_us: u64, duty: f32) {
        self.changes.retain(|c| c.start_us < start_us);
        self.changes.push(Change { start_us, duty });
    }

    /// Forget changes superseded before `now`
    fn prune(&mut self, now: u64) {
        let keep_from = self
            .changes
            .iter()
            .rposition(|c| c.start_us <= now)
            .unwrap_or(0);
        self.changes.drain(..keep_from);
    }
}

/// Software line implementing [`DutyOutput`], [`LevelInput`] and [`Clock`]
///
/// All methods take `&self`, so one line can be handed to the driver as
/// output, input and clock at once.
#[derive(Debug)]
pub struct SimLine {
    now: Cell<u64>,
    step_us: u64,
    period_us: u64,
    output: RefCell<Timeline>,
    script: RefCell<Option<Timeline>>,
    requested: Cell<f32>,
    duty_writes: Cell<u64>,
    reads: Cell<u64>,
    glitch_every: Cell<Option<u64>>,
    stuck: Cell<Option<bool>>,
}

impl SimLine {
    /// Loopback line with the given PWM period, output idle at 0%
    #[must_use]
    pub fn new(period_us: u64) -> Self {
        Self {
            now: Cell::new(0),
            step_us: 1,
            period_us: period_us.max(1),
            output: RefCell::new(Timeline::new()),
            script: RefCell::new(None),
            requested: Cell::new(0.0),
            duty_writes: Cell::new(0),
            reads: Cell::new(0),
            glitch_every: Cell::new(None),
            stuck: Cell::new(None),
        }
    }

    /// Advance the clock by `step_us` per read instead of 1 µs
    #[must_use]
    pub fn with_step(mut self, step_us: u64) -> Self {
        self.step_us = step_us.max(1);
        self
    }

    /// Flip every `n`th input read (`n >= 2`; `None` disables)
    pub fn set_glitch_every(&self, n: Option<u64>) {
        self.glitch_every.set(n.filter(|&n| n >= 2));
    }

    /// Force the input to a fixed level (`None` releases it)
    pub fn set_stuck(&self, level: Option<bool>) {
        self.stuck.set(level);
    }

    /// PWM period
    #[must_use]
    pub const fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Current time without advancing it
    #[must_use]
    pub fn peek_us(&self) -> u64 {
        self.now.get()
    }

    /// Move time forward without polling
    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get().saturating_add(us));
    }

    /// First period boundary strictly after `t`
    #[must_use]
    pub fn next_boundary(&self, t: u64) -> u64 {
        (t / self.period_us + 1) * self.period_us
    }

    /// Set the output duty; it takes effect at the next period boundary
    pub fn set_duty(&self, duty: f32) {
        let now = self.now.get();
        let mut output = self.output.borrow_mut();
        output.prune(now);
        output.set_from(self.next_boundary(now), duty);
        self.requested.set(duty);
        self.duty_writes.set(self.duty_writes.get() + 1);
    }

    /// Last duty requested on the output
    #[must_use]
    pub fn requested_duty(&self) -> f32 {
        self.requested.get()
    }

    /// Number of output writes so far
    #[must_use]
    pub fn duty_writes(&self) -> u64 {
        self.duty_writes.get()
    }

    /// Number of input reads so far
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    /// Drive the input from a script instead of the output
    ///
    /// Each `(duty, cycles)` pair is held for that many periods, starting at
    /// the first period boundary at or after `start_us`. The input reads
    /// low after the script ends.
    pub fn play(&self, start_us: u64, segments: &[(f32, u32)]) {
        let mut t = start_us.div_ceil(self.period_us) * self.period_us;
        let mut script = self.script.borrow_mut();
        let timeline = script.get_or_insert_with(Timeline::new);
        for &(duty, cycles) in segments {
            timeline.set_from(t, duty);
            t += u64::from(cycles) * self.period_us;
        }
        timeline.set_from(t, 0.0);
    }

    /// Return the input to following the output
    pub fn loopback(&self) {
        *self.script.borrow_mut() = None;
    }

    /// Duty on the input waveform at time `t`
    #[must_use]
    pub fn input_duty_at(&self, t: u64) -> f32 {
        match &*self.script.borrow() {
            Some(script) => script.duty_at(t),
            None => self.output.borrow().duty_at(t),
        }
    }

    /// Ideal input level at time `t`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn level_at(&self, t: u64) -> bool {
        let duty = self.input_duty_at(t);
        let phase = (t % self.period_us) as f32;
        phase < duty * self.period_us as f32
    }

    fn read(&self) -> bool {
        let n = self.reads.get() + 1;
        self.reads.set(n);

        if let Some(level) = self.stuck.get() {
            return level;
        }
        let level = self.level_at(self.now.get());
        match self.glitch_every.get() {
            Some(every) if n % every == 0 => !level,
            _ => level,
        }
    }
}

impl Clock for SimLine {
    fn now_us(&self) -> u64 {
        let t = self.now.get().saturating_add(self.step_us);
        self.now.set(t);
        t
    }
}

impl DutyOutput for &SimLine {
    fn set_ratio(&mut self, ratio: DutyRatio) {
        self.set_duty(ratio.fraction());
    }
}

impl LevelInput for &SimLine {
    fn is_high(&mut self) -> bool {
        self.read()
    }
}
