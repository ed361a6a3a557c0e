//! Common test doubles for integration tests
//!
//! This module provides:
//! - Recording output pins that log every level change to a shared trace
//! - Scripted ADC channels that replay fixed counts
//! - A fake delay that advances a shared clock instead of sleeping
//! - A synthetic excitation source that returns fixed raw batches
//!
//! Everything that touches the trace shares one `Rc`, so a test can assert
//! on the exact interleaving of pin changes, delays and conversions.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use ctdlog_core::config::{AdcConfig, ExcitationTiming, SampleCount};
use ctdlog_core::excitation::{ExcitationSource, PhaseSamples, PolarityBatches};
use ctdlog_core::time::{Clock, Micros};
use ctdlog_core::{AdcChannel, MeasurementResult};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

pub mod scenarios;

/// One observable hardware action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pin { name: &'static str, high: bool },
    Delay { us: u64 },
    Read { name: &'static str },
}

/// Shared, ordered record of hardware actions
#[derive(Debug, Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<Event>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Delays in order, in microseconds
    pub fn delays(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Delay { us } => Some(us),
                _ => None,
            })
            .collect()
    }

    /// Replay the pin events and return the level of every named pin at the end
    pub fn final_levels(&self) -> Vec<(&'static str, bool)> {
        let mut levels: Vec<(&'static str, bool)> = Vec::new();
        for event in self.events() {
            if let Event::Pin { name, high } = event {
                match levels.iter_mut().find(|(n, _)| *n == name) {
                    Some(level) => level.1 = high,
                    None => levels.push((name, high)),
                }
            }
        }
        levels
    }
}

/// Microsecond clock shared between a delay and the code under test
#[derive(Debug, Clone, Default)]
pub struct SharedClock(Rc<Cell<u64>>);

impl SharedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

impl Clock for SharedClock {
    fn now_us(&mut self) -> Micros {
        self.0.get() / 1000
    }
}

/// Delay that advances the shared clock and logs the requested duration
#[derive(Debug, Clone)]
pub struct FakeDelay {
    clock: SharedClock,
    trace: Trace,
}

impl FakeDelay {
    pub fn new(clock: SharedClock, trace: Trace) -> Self {
        Self { clock, trace }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(ns as u64);
        self.trace.push(Event::Delay { us: ns as u64 / 1000 });
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.advance_ns(us as u64 * 1000);
        self.trace.push(Event::Delay { us: us as u64 });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance_ns(ms as u64 * 1_000_000);
        self.trace.push(Event::Delay { us: ms as u64 * 1000 });
    }
}

/// Output pin that records every level change
#[derive(Debug, Clone)]
pub struct RecordingPin {
    name: &'static str,
    trace: Trace,
    level: Rc<Cell<bool>>,
    /// Successful `set_high` calls left before the pin starts failing
    highs_until_failure: Option<Rc<Cell<usize>>>,
}

impl RecordingPin {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: trace.clone(),
            level: Rc::new(Cell::new(false)),
            highs_until_failure: None,
        }
    }

    /// Pin whose driver errors on the `n + 1`-th `set_high`
    pub fn failing_after(name: &'static str, trace: &Trace, n: usize) -> Self {
        Self {
            highs_until_failure: Some(Rc::new(Cell::new(n))),
            ..Self::new(name, trace)
        }
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for RecordingPin {
    type Error = ErrorKind;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), ErrorKind> {
        self.level.set(false);
        self.trace.push(Event::Pin { name: self.name, high: false });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), ErrorKind> {
        if let Some(left) = &self.highs_until_failure {
            if left.get() == 0 {
                return Err(ErrorKind::Other);
            }
            left.set(left.get() - 1);
        }
        self.level.set(true);
        self.trace.push(Event::Pin { name: self.name, high: true });
        Ok(())
    }
}

/// ADC channel that replays a script of raw words, cycling when it runs out
#[derive(Debug, Clone)]
pub struct ScriptedAdc {
    name: &'static str,
    trace: Trace,
    words: Vec<u16>,
    cursor: usize,
    /// `WouldBlock` polls before each conversion completes
    busy_polls: u8,
    busy: u8,
}

impl ScriptedAdc {
    pub fn new(name: &'static str, trace: &Trace, words: Vec<u16>) -> Self {
        Self {
            name,
            trace: trace.clone(),
            words,
            cursor: 0,
            busy_polls: 2,
            busy: 2,
        }
    }

    pub fn constant(name: &'static str, trace: &Trace, word: u16) -> Self {
        Self::new(name, trace, vec![word])
    }

    pub fn reads(&self) -> usize {
        self.cursor
    }
}

impl AdcChannel for ScriptedAdc {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u16, Infallible> {
        if self.busy > 0 {
            self.busy -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.busy = self.busy_polls;
        let word = self.words[self.cursor % self.words.len()];
        self.cursor += 1;
        self.trace.push(Event::Read { name: self.name });
        Ok(word)
    }
}

/// ADC channel whose driver always fails
#[derive(Debug, Clone, Default)]
pub struct BrokenAdc;

impl AdcChannel for BrokenAdc {
    type Error = ();

    fn read(&mut self) -> nb::Result<u16, ()> {
        Err(nb::Error::Other(()))
    }
}

/// Excitation source returning fixed batches, for exercising the
/// conversion and calibration stages without pins
#[derive(Debug, Clone)]
pub struct SyntheticSource<const CH: usize> {
    batches: PolarityBatches<CH>,
    adc: AdcConfig,
    pub calls: usize,
}

impl SyntheticSource<3> {
    /// Four-pole batches: current, probe 3, probe 4 for each polarity
    pub fn four_pole(forward: [&[u16]; 3], reverse: [&[u16]; 3]) -> Self {
        Self::from_batches(forward, reverse)
    }
}

impl SyntheticSource<1> {
    pub fn two_pole(forward: &[u16], reverse: &[u16]) -> Self {
        Self::from_batches([forward], [reverse])
    }
}

impl<const CH: usize> SyntheticSource<CH> {
    fn from_batches(forward: [&[u16]; CH], reverse: [&[u16]; CH]) -> Self {
        let mut batches = PolarityBatches::new();
        batches.forward = PhaseSamples::from_batches(forward).expect("forward batches");
        batches.reverse = PhaseSamples::from_batches(reverse).expect("reverse batches");
        Self {
            batches,
            adc: AdcConfig::twelve_bit(),
            calls: 0,
        }
    }
}

impl<const CH: usize> ExcitationSource<CH> for SyntheticSource<CH> {
    fn acquire(
        &mut self,
        _samples: SampleCount,
        _timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<CH>> {
        self.calls += 1;
        Ok(self.batches.clone())
    }

    fn adc(&self) -> AdcConfig {
        self.adc
    }
}

/// Approximate float comparison with a relative tolerance
pub fn assert_close(actual: f32, expected: f64, rel: f64) {
    let diff = (actual as f64 - expected).abs();
    let scale = expected.abs().max(1e-12);
    assert!(
        diff / scale <= rel,
        "expected {expected}, got {actual} (relative error {})",
        diff / scale
    );
}
